//! 라우터 에러 타입
//!
//! [`RouterError`]는 라우터 구성 단계에서 발생하는 에러를 표현합니다.
//! 메시지 처리 중의 쓰기/로테이션 실패는 에러로 전파되지 않고
//! 경고 로그와 카운터로만 남습니다 (코어는 데이터 에러로 중단하지
//! 않습니다).

use pmlogd_core::PmlogError;

/// 라우터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// 설정 검증 실패
    #[error("config error: {0}")]
    Config(#[from] pmlogd_core::ConfigError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RouterError> for PmlogError {
    fn from(err: RouterError) -> Self {
        PmlogError::Routing(err.to_string())
    }
}
