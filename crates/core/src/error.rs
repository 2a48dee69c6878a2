//! 에러 타입 — 도메인별 에러 정의

/// pmlogd 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PmlogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 라우팅 엔진 에러
    #[error("routing error: {0}")]
    Routing(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 구문 오류와 필수 섹션 위반은 로드 전체를 실패시키며,
/// 호출자는 기본 설정으로 대체합니다. 범위를 벗어난 숫자 값은
/// 에러가 아니라 경고와 함께 클램프됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 읽을 수 없음
    #[error("cannot read config file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },

    /// 설정 파일 구문 오류
    #[error("syntax error at line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// 필수 키 누락
    #[error("section '{section}': missing required key '{key}'")]
    MissingKey { section: String, key: String },

    /// 유효하지 않은 값
    #[error("section '{section}': invalid value for '{key}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },

    /// 첫 번째 출력이 stdlog가 아님
    #[error("first output must be 'stdlog', found '{found}'")]
    ExpectedStdlog { found: String },

    /// 첫 번째 컨텍스트가 <global>이 아님
    #[error("first context must be '<global>', found '{found}'")]
    ExpectedGlobalContext { found: String },

    /// 출력 섹션이 하나도 없음
    #[error("no output sections defined")]
    NoOutputs,

    /// <global> 컨텍스트가 정의되지 않음
    #[error("no '<global>' context defined")]
    NoGlobalContext,

    /// 규칙이 선언되지 않은 출력을 참조함
    #[error("context '{context}' {rule}: unknown output '{output}'")]
    UnknownOutput {
        context: String,
        rule: String,
        output: String,
    },

    /// 출력 정의 개수 초과
    #[error("too many output definitions (max {max})")]
    TooManyOutputs { max: usize },

    /// 컨텍스트 규칙 개수 초과
    #[error("context '{context}': too many rules (max {max})")]
    TooManyRules { context: String, max: usize },
}
