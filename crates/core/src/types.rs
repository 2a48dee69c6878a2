//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! syslog facility/level 코드와 라우팅 대상 메시지를 정의합니다.
//! 모든 크레이트는 이 타입들을 사용하여 메시지를 교환합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// syslog facility 코드 (RFC 3164 Section 4.1.1)
///
/// 예약된 코드 12~15 (ntp, audit 등)는 설정 파일에서 지정할 수 없으므로
/// 정의하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facility {
    /// 커널 메시지 (0)
    Kern,
    /// 사용자 레벨 메시지 (1)
    User,
    /// 메일 시스템 (2)
    Mail,
    /// 시스템 데몬 (3)
    Daemon,
    /// 보안/인증 (4)
    Auth,
    /// syslog 내부 메시지 (5)
    Syslog,
    /// 프린터 서브시스템 (6)
    Lpr,
    /// 네트워크 뉴스 (7)
    News,
    /// UUCP (8)
    Uucp,
    /// cron 데몬 (9)
    Cron,
    /// 보안/인증 (비공개, 10)
    Authpriv,
    /// FTP 데몬 (11)
    Ftp,
    /// 로컬 용도 0 (16)
    Local0,
    /// 로컬 용도 1 (17)
    Local1,
    /// 로컬 용도 2 (18)
    Local2,
    /// 로컬 용도 3 (19)
    Local3,
    /// 로컬 용도 4 (20)
    Local4,
    /// 로컬 용도 5 (21)
    Local5,
    /// 로컬 용도 6 (22)
    Local6,
    /// 로컬 용도 7 (23)
    Local7,
}

impl Facility {
    /// syslog facility 숫자 코드를 반환합니다.
    pub fn code(self) -> u8 {
        match self {
            Self::Kern => 0,
            Self::User => 1,
            Self::Mail => 2,
            Self::Daemon => 3,
            Self::Auth => 4,
            Self::Syslog => 5,
            Self::Lpr => 6,
            Self::News => 7,
            Self::Uucp => 8,
            Self::Cron => 9,
            Self::Authpriv => 10,
            Self::Ftp => 11,
            Self::Local0 => 16,
            Self::Local1 => 17,
            Self::Local2 => 18,
            Self::Local3 => 19,
            Self::Local4 => 20,
            Self::Local5 => 21,
            Self::Local6 => 22,
            Self::Local7 => 23,
        }
    }

    /// 숫자 코드에서 facility를 복원합니다.
    ///
    /// 예약 코드(12~15)와 범위 밖 값은 `None`을 반환합니다.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Kern),
            1 => Some(Self::User),
            2 => Some(Self::Mail),
            3 => Some(Self::Daemon),
            4 => Some(Self::Auth),
            5 => Some(Self::Syslog),
            6 => Some(Self::Lpr),
            7 => Some(Self::News),
            8 => Some(Self::Uucp),
            9 => Some(Self::Cron),
            10 => Some(Self::Authpriv),
            11 => Some(Self::Ftp),
            16 => Some(Self::Local0),
            17 => Some(Self::Local1),
            18 => Some(Self::Local2),
            19 => Some(Self::Local3),
            20 => Some(Self::Local4),
            21 => Some(Self::Local5),
            22 => Some(Self::Local6),
            23 => Some(Self::Local7),
            _ => None,
        }
    }

    /// 설정 파일 키워드에서 facility를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kern" => Some(Self::Kern),
            "user" => Some(Self::User),
            "mail" => Some(Self::Mail),
            "daemon" => Some(Self::Daemon),
            "auth" => Some(Self::Auth),
            "syslog" => Some(Self::Syslog),
            "lpr" => Some(Self::Lpr),
            "news" => Some(Self::News),
            "uucp" => Some(Self::Uucp),
            "cron" => Some(Self::Cron),
            "authpriv" => Some(Self::Authpriv),
            "ftp" => Some(Self::Ftp),
            "local0" => Some(Self::Local0),
            "local1" => Some(Self::Local1),
            "local2" => Some(Self::Local2),
            "local3" => Some(Self::Local3),
            "local4" => Some(Self::Local4),
            "local5" => Some(Self::Local5),
            "local6" => Some(Self::Local6),
            "local7" => Some(Self::Local7),
            _ => None,
        }
    }

    /// 설정 파일 키워드를 반환합니다.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Kern => "kern",
            Self::User => "user",
            Self::Mail => "mail",
            Self::Daemon => "daemon",
            Self::Auth => "auth",
            Self::Syslog => "syslog",
            Self::Lpr => "lpr",
            Self::News => "news",
            Self::Uucp => "uucp",
            Self::Cron => "cron",
            Self::Authpriv => "authpriv",
            Self::Ftp => "ftp",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// syslog 심각도 레벨 (RFC 3164 Section 4.1.1)
///
/// 숫자 코드가 작을수록 심각합니다 (`Emergency`=0 .. `Debug`=7).
/// 파생된 `Ord`는 코드 순서를 따르므로 `Emergency < Debug`입니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LogLevel {
    /// 시스템 사용 불가 (0)
    Emergency,
    /// 즉시 조치 필요 (1)
    Alert,
    /// 치명적 상태 (2)
    Critical,
    /// 에러 (3)
    Error,
    /// 경고 (4)
    Warning,
    /// 정상이지만 주목할 상태 (5)
    Notice,
    /// 정보성 (6)
    Info,
    /// 디버그 (7)
    Debug,
}

impl LogLevel {
    /// syslog 심각도 숫자 코드를 반환합니다.
    pub fn code(self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::Alert => 1,
            Self::Critical => 2,
            Self::Error => 3,
            Self::Warning => 4,
            Self::Notice => 5,
            Self::Info => 6,
            Self::Debug => 7,
        }
    }

    /// 숫자 코드에서 레벨을 복원합니다.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Emergency),
            1 => Some(Self::Alert),
            2 => Some(Self::Critical),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::Notice),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }

    /// 설정 파일 키워드에서 레벨을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "emerg" => Some(Self::Emergency),
            "alert" => Some(Self::Alert),
            "crit" => Some(Self::Critical),
            "err" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    /// 설정 파일 키워드를 반환합니다.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Emergency => "emerg",
            Self::Alert => "alert",
            Self::Critical => "crit",
            Self::Error => "err",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// `threshold`와 같거나 더 심각한지 확인합니다.
    ///
    /// 숫자 코드가 작을수록 심각하므로 `code() <= threshold.code()`입니다.
    pub fn at_least(self, threshold: Self) -> bool {
        self.code() <= threshold.code()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 라우팅 대상 메시지
///
/// 수신부가 포맷을 끝낸 한 줄과 분류에 필요한 메타데이터를 담습니다.
/// `line`은 개행 문자를 포함하지 않으며, 출력 파일에 기록될 때
/// 단일 `\n`이 덧붙습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    /// 메시지를 발생시킨 컨텍스트 이름
    pub context: String,
    /// syslog facility
    pub facility: Facility,
    /// 심각도
    pub level: LogLevel,
    /// 프로그램명 (syslog tag)
    pub program: String,
    /// 완성된 출력 라인 (개행 미포함)
    pub line: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}.{}] {} ({}): {}",
            self.facility, self.level, self.program, self.context, self.line,
        )
    }
}
