use anyhow::{Context, Result};
use clap::Parser;

use pmlogd_core::RoutingConfig;

use pmlogd_daemon::cli::DaemonCli;
use pmlogd_daemon::daemon::Daemon;
use pmlogd_daemon::logging;
use pmlogd_daemon::pidlock::{self, PidLock};
use pmlogd_daemon::receiver::ReceiverConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    // 로깅 초기화
    logging::init_tracing(
        args.log_level.as_deref().unwrap_or("info"),
        args.log_format.as_deref().unwrap_or("pretty"),
    )?;

    // --validate: 설정을 엄격하게 로드하고 테이블을 출력 후 종료
    if args.validate {
        let config = RoutingConfig::load(&args.config)
            .with_context(|| format!("invalid configuration: {}", args.config.display()))?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!("pmlogd-daemon starting");

    // 단일 인스턴스 잠금 -- 실패 시 비정상 종료
    let pid_file = args
        .pid_file
        .clone()
        .unwrap_or_else(|| pidlock::DEFAULT_PID_FILE.into());
    let _pid_lock = PidLock::acquire(&pid_file)
        .with_context(|| format!("failed to acquire process lock at {}", pid_file.display()))?;
    tracing::info!(pid_file = %pid_file.display(), "process lock acquired");

    // 설정 로드 -- 파싱 실패는 종료 사유가 아니며 기본 설정으로 대체
    let config = RoutingConfig::load_or_default(&args.config);
    tracing::info!(
        outputs = config.outputs().len(),
        contexts = config.context_count(),
        "configuration loaded"
    );

    let mut receiver_config = ReceiverConfig::default();
    if let Some(bind) = args.bind {
        receiver_config.bind_addr = bind;
    }

    // 데몬 조립 및 실행 (수신 소켓 바인드 실패 시 비정상 종료)
    let daemon = Daemon::new(config, receiver_config)?;
    daemon.run().await?;

    tracing::info!("pmlogd-daemon shut down");
    Ok(())
}
