//! 라우팅 설정 — pmlogd.conf 파싱 및 설정 모델
//!
//! `[OUTPUT=<name>]` / `[CONTEXT=<name>]` 그룹으로 구성된 설정 파일을
//! 불변 출력/컨텍스트 테이블로 변환합니다. 테이블은 시작 시 한 번
//! 구성되고 프로세스 수명 동안 읽기 전용입니다.
//!
//! # 파싱 계약
//! - 첫 번째 OUTPUT 그룹은 반드시 `stdlog`, 첫 번째 CONTEXT 그룹은
//!   반드시 `<global>`이어야 합니다.
//! - 규칙의 출력 이름은 이미 선언된 출력으로 해석되어야 합니다.
//! - 알 수 없는 그룹은 경고 후 건너뜁니다.
//! - 어느 섹션이든 실패하면 로드 전체가 실패하며, 호출자는
//!   [`RoutingConfig::default`]의 하드코딩된 기본 설정을 설치합니다.
//!
//! # 사용 예시
//! ```ignore
//! use pmlogd_core::RoutingConfig;
//!
//! let config = RoutingConfig::load_or_default("/etc/pmlog/pmlogd.conf");
//! assert_eq!(config.outputs()[0].name, "stdlog");
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keyfile::{Group, KeyFile};
use crate::types::{Facility, LogLevel};
use crate::units::{parse_int, parse_size};

/// 필수 기본 출력 이름 (인덱스 0)
pub const OUTPUT_STDLOG: &str = "stdlog";

/// 필수 기본 컨텍스트 이름
pub const CONTEXT_GLOBAL: &str = "<global>";

/// 기본 설정이 사용하는 로그 파일 경로
pub const DEFAULT_LOG_FILE_PATH: &str = "/var/log/messages";

/// 출력 정의 최대 개수
pub const MAX_NUM_OUTPUTS: usize = 16;

/// 컨텍스트당 규칙 최대 개수
pub const MAX_RULES_PER_CONTEXT: usize = 32;

/// 출력 이름 최대 길이
pub const OUTPUT_NAME_MAX_LEN: usize = 32;

/// 컨텍스트 이름 최대 길이
pub const CONTEXT_NAME_MAX_LEN: usize = 31;

/// 로그 파일 최소 크기 (4 KiB)
pub const MIN_LOG_SIZE: u64 = 4 * 1024;

/// 로그 파일 최대 크기 (64 MiB)
pub const MAX_LOG_SIZE: u64 = 64 * 1024 * 1024;

/// 로그 파일 기본 크기 (1 MiB)
pub const DEFAULT_LOG_SIZE: u64 = 1024 * 1024;

/// 로테이션 최소 개수
pub const MIN_ROTATIONS: u32 = 1;

/// 로테이션 최대 개수
pub const MAX_ROTATIONS: u32 = 9;

/// 로테이션 기본 개수
pub const DEFAULT_ROTATIONS: u32 = 1;

/// 출력 정의 — 이름이 붙은 로테이션 파일 싱크
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConf {
    /// 출력 이름
    pub name: String,
    /// 로그 파일 절대 경로
    pub path: PathBuf,
    /// 파일 최대 크기 (바이트). 도달 시 로테이션이 일어납니다.
    pub max_size: u64,
    /// 보관 세대 수 (`P.1` .. `P.N`)
    pub rotations: u32,
}

/// 라우팅 규칙 — 필터와 대상 출력의 쌍
///
/// `facility`/`level`/`program`이 `None`이면 와일드카드(`*`)입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    /// 매칭할 facility (None = 전체)
    pub facility: Option<Facility>,
    /// 매칭할 레벨 (None = 전체)
    pub level: Option<LogLevel>,
    /// true면 레벨이 일치하지 *않는* 메시지에 매칭 (`!` 접두사)
    pub level_invert: bool,
    /// 매칭할 프로그램명 (None = 전체)
    pub program: Option<String>,
    /// 대상 출력 인덱스
    pub output_index: usize,
    /// true면 매칭 시 해당 출력으로의 기록을 억제 (`-` 접두사)
    pub omit: bool,
}

/// 컨텍스트 링 버퍼 설정
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RingBufferConf {
    /// 보관 바이트 예산
    pub size: u64,
    /// 플러시를 유발하는 심각도 임계값
    pub flush_level: LogLevel,
}

/// 컨텍스트 정의 — 규칙 목록과 선택적 링 버퍼
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConf {
    /// 컨텍스트 이름
    pub name: String,
    /// 선언 순서대로 평가되는 규칙 목록
    pub rules: Vec<RouteRule>,
    /// 링 버퍼 설정 (BufferSize가 양수인 경우에만)
    pub ring_buffer: Option<RingBufferConf>,
}

/// 라우팅 설정 전체 — 출력 테이블과 컨텍스트 테이블
///
/// 로드 이후 어떤 컴포넌트도 이 값을 변경하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    outputs: Vec<OutputConf>,
    contexts: HashMap<String, ContextConf>,
}

impl Default for RoutingConfig {
    /// 하드코딩된 기본 설정: `stdlog -> /var/log/messages`,
    /// `<global>`에 `*.*,stdlog` 규칙 하나.
    fn default() -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(
            CONTEXT_GLOBAL.to_owned(),
            ContextConf {
                name: CONTEXT_GLOBAL.to_owned(),
                rules: vec![RouteRule {
                    facility: None,
                    level: None,
                    level_invert: false,
                    program: None,
                    output_index: 0,
                    omit: false,
                }],
                ring_buffer: None,
            },
        );
        Self {
            outputs: vec![OutputConf {
                name: OUTPUT_STDLOG.to_owned(),
                path: PathBuf::from(DEFAULT_LOG_FILE_PATH),
                max_size: DEFAULT_LOG_SIZE,
                rotations: DEFAULT_ROTATIONS,
            }],
            contexts,
        }
    }
}

impl RoutingConfig {
    /// 설정 파일을 로드합니다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let keyfile = KeyFile::load(path.as_ref())?;
        Self::from_keyfile(&keyfile)
    }

    /// 설정 파일을 로드하되, 실패 시 경고를 남기고 기본 설정을 반환합니다.
    ///
    /// 설정 파싱 실패는 프로세스 종료 사유가 아닙니다.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load configuration, installing defaults"
                );
                Self::default()
            }
        }
    }

    /// 파싱된 키-값 파일에서 설정을 구성합니다.
    pub fn from_keyfile(keyfile: &KeyFile) -> Result<Self, ConfigError> {
        const OUTPUT_PREFIX: &str = "OUTPUT=";
        const CONTEXT_PREFIX: &str = "CONTEXT=";

        let mut config = Self {
            outputs: Vec::new(),
            contexts: HashMap::new(),
        };
        let mut saw_context = false;

        for group in keyfile.groups() {
            if let Some(name) = group.name().strip_prefix(OUTPUT_PREFIX) {
                config.parse_output_group(name, group)?;
            } else if let Some(name) = group.name().strip_prefix(CONTEXT_PREFIX) {
                if !saw_context && name != CONTEXT_GLOBAL {
                    return Err(ConfigError::ExpectedGlobalContext {
                        found: name.to_owned(),
                    });
                }
                saw_context = true;
                config.parse_context_group(name, group)?;
            } else {
                tracing::warn!(group = group.name(), "unrecognized config group, skipping");
            }
        }

        if config.outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        if !config.contexts.contains_key(CONTEXT_GLOBAL) {
            return Err(ConfigError::NoGlobalContext);
        }

        config.validate()?;
        Ok(config)
    }

    /// 출력 테이블을 반환합니다.
    pub fn outputs(&self) -> &[OutputConf] {
        &self.outputs
    }

    /// 인덱스로 출력을 조회합니다.
    pub fn output(&self, index: usize) -> Option<&OutputConf> {
        self.outputs.get(index)
    }

    /// 이름으로 출력 인덱스를 조회합니다.
    ///
    /// 테이블이 작으므로 선형 탐색으로 충분합니다.
    pub fn find_output(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }

    /// 컨텍스트를 이름으로 조회합니다. 알 수 없는 이름은 `<global>`로
    /// 대체됩니다.
    pub fn resolve_context(&self, name: &str) -> Option<&ContextConf> {
        self.contexts
            .get(name)
            .or_else(|| self.contexts.get(CONTEXT_GLOBAL))
    }

    /// 모든 컨텍스트를 순회합니다.
    pub fn contexts(&self) -> impl Iterator<Item = &ContextConf> {
        self.contexts.values()
    }

    /// 컨텍스트 수를 반환합니다.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// 설정 불변식을 검증합니다.
    ///
    /// - `outputs[0]`은 `stdlog`, `<global>` 컨텍스트 존재
    /// - 출력 이름 유일성, 크기/로테이션 범위, 절대 경로
    /// - 모든 규칙의 `output_index`가 유효
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.outputs.first() {
            None => return Err(ConfigError::NoOutputs),
            Some(first) if first.name != OUTPUT_STDLOG => {
                return Err(ConfigError::ExpectedStdlog {
                    found: first.name.clone(),
                });
            }
            Some(_) => {}
        }
        if !self.contexts.contains_key(CONTEXT_GLOBAL) {
            return Err(ConfigError::NoGlobalContext);
        }
        if self.outputs.len() > MAX_NUM_OUTPUTS {
            return Err(ConfigError::TooManyOutputs {
                max: MAX_NUM_OUTPUTS,
            });
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    section: output.name.clone(),
                    key: "name".to_owned(),
                    reason: "duplicate output name".to_owned(),
                });
            }
            if !output.path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    section: output.name.clone(),
                    key: "File".to_owned(),
                    reason: "expected absolute path".to_owned(),
                });
            }
            if output.max_size < MIN_LOG_SIZE || output.max_size > MAX_LOG_SIZE {
                return Err(ConfigError::InvalidValue {
                    section: output.name.clone(),
                    key: "MaxSize".to_owned(),
                    reason: format!("{} out of range", output.max_size),
                });
            }
            if output.rotations < MIN_ROTATIONS || output.rotations > MAX_ROTATIONS {
                return Err(ConfigError::InvalidValue {
                    section: output.name.clone(),
                    key: "Rotations".to_owned(),
                    reason: format!("{} out of range", output.rotations),
                });
            }
        }

        for context in self.contexts.values() {
            if context.rules.len() > MAX_RULES_PER_CONTEXT {
                return Err(ConfigError::TooManyRules {
                    context: context.name.clone(),
                    max: MAX_RULES_PER_CONTEXT,
                });
            }
            for (idx, rule) in context.rules.iter().enumerate() {
                if rule.output_index >= self.outputs.len() {
                    return Err(ConfigError::UnknownOutput {
                        context: context.name.clone(),
                        rule: format!("Rule{}", idx + 1),
                        output: format!("#{}", rule.output_index),
                    });
                }
            }
        }

        Ok(())
    }

    /// `[OUTPUT=<name>]` 그룹을 파싱하여 출력 테이블에 반영합니다.
    fn parse_output_group(&mut self, name: &str, group: &Group) -> Result<(), ConfigError> {
        // 첫 번째 출력은 stdlog여야 함
        if self.outputs.is_empty() && name != OUTPUT_STDLOG {
            return Err(ConfigError::ExpectedStdlog {
                found: name.to_owned(),
            });
        }
        if name.is_empty() || name.len() > OUTPUT_NAME_MAX_LEN {
            return Err(ConfigError::InvalidValue {
                section: name.to_owned(),
                key: "name".to_owned(),
                reason: format!("output name must be 1-{OUTPUT_NAME_MAX_LEN} characters"),
            });
        }

        let path = match group.get("File") {
            None => {
                return Err(ConfigError::MissingKey {
                    section: name.to_owned(),
                    key: "File".to_owned(),
                });
            }
            Some(value) if value.starts_with('/') => PathBuf::from(value),
            Some(value) => {
                return Err(ConfigError::InvalidValue {
                    section: name.to_owned(),
                    key: "File".to_owned(),
                    reason: format!("expected full path, got '{value}'"),
                });
            }
        };

        let mut max_size = DEFAULT_LOG_SIZE;
        if let Some(value) = group.get("MaxSize") {
            match parse_size(value) {
                Some(n) if n < MIN_LOG_SIZE => {
                    tracing::warn!(
                        output = name,
                        value,
                        "MaxSize below 4KB minimum, clamping"
                    );
                    max_size = MIN_LOG_SIZE;
                }
                Some(n) if n > MAX_LOG_SIZE => {
                    tracing::warn!(
                        output = name,
                        value,
                        "MaxSize above 64MB maximum, clamping"
                    );
                    max_size = MAX_LOG_SIZE;
                }
                Some(n) => max_size = n,
                None => {
                    tracing::warn!(
                        output = name,
                        value,
                        "unrecognized MaxSize format, using default"
                    );
                }
            }
        }

        let mut rotations = DEFAULT_ROTATIONS;
        if let Some(value) = group.get("Rotations") {
            match parse_int(value).and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n < MIN_ROTATIONS => {
                    tracing::warn!(output = name, value, "Rotations below minimum, clamping");
                    rotations = MIN_ROTATIONS;
                }
                Some(n) if n > MAX_ROTATIONS => {
                    tracing::warn!(output = name, value, "Rotations above maximum, clamping");
                    rotations = MAX_ROTATIONS;
                }
                Some(n) => rotations = n,
                None => {
                    tracing::warn!(
                        output = name,
                        value,
                        "unrecognized Rotations value, using default"
                    );
                }
            }
        }

        // 재선언은 크기/로테이션만 갱신하고 이름과 경로는 유지
        if let Some(index) = self.find_output(name) {
            self.outputs[index].max_size = max_size;
            self.outputs[index].rotations = rotations;
            return Ok(());
        }

        if self.outputs.len() >= MAX_NUM_OUTPUTS {
            return Err(ConfigError::TooManyOutputs {
                max: MAX_NUM_OUTPUTS,
            });
        }
        self.outputs.push(OutputConf {
            name: name.to_owned(),
            path,
            max_size,
            rotations,
        });
        Ok(())
    }

    /// `[CONTEXT=<name>]` 그룹을 파싱하여 컨텍스트 테이블에 반영합니다.
    fn parse_context_group(&mut self, name: &str, group: &Group) -> Result<(), ConfigError> {
        if name.is_empty() || name.len() > CONTEXT_NAME_MAX_LEN {
            return Err(ConfigError::InvalidValue {
                section: name.to_owned(),
                key: "name".to_owned(),
                reason: format!("context name must be 1-{CONTEXT_NAME_MAX_LEN} characters"),
            });
        }

        // Rule1, Rule2, ... 첫 번째 빠진 번호까지 순서대로 스캔
        let mut rules = Vec::new();
        for rule_no in 1.. {
            let key = format!("Rule{rule_no}");
            let Some(value) = group.get(&key) else { break };
            rules.push(self.parse_rule(name, &key, value)?);
            if rules.len() > MAX_RULES_PER_CONTEXT {
                return Err(ConfigError::TooManyRules {
                    context: name.to_owned(),
                    max: MAX_RULES_PER_CONTEXT,
                });
            }
        }

        let mut buffer_size = 0u64;
        if let Some(value) = group.get("BufferSize") {
            buffer_size = parse_size(value).ok_or_else(|| ConfigError::InvalidValue {
                section: name.to_owned(),
                key: "BufferSize".to_owned(),
                reason: format!("unrecognized size '{value}'"),
            })?;
        }

        let mut flush_level = LogLevel::Emergency;
        if let Some(value) = group.get("FlushLevel") {
            flush_level =
                LogLevel::from_keyword(value).ok_or_else(|| ConfigError::InvalidValue {
                    section: name.to_owned(),
                    key: "FlushLevel".to_owned(),
                    reason: format!("unrecognized level '{value}'"),
                })?;
        }

        let ring_buffer = (buffer_size > 0).then_some(RingBufferConf {
            size: buffer_size,
            flush_level,
        });

        // 재선언은 규칙 목록과 버퍼 설정을 교체
        self.contexts.insert(
            name.to_owned(),
            ContextConf {
                name: name.to_owned(),
                rules,
                ring_buffer,
            },
        );
        Ok(())
    }

    /// 규칙 문자열을 파싱합니다.
    ///
    /// 문법: `<facility>[.[!]<level>[.<program>]],[-]<outputName>`
    fn parse_rule(
        &self,
        context: &str,
        rule_key: &str,
        value: &str,
    ) -> Result<RouteRule, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            section: context.to_owned(),
            key: rule_key.to_owned(),
            reason,
        };

        let mut rest = value;

        let (facility_tok, mut sep) = next_token(&mut rest, &['.', ',']);
        let facility = if facility_tok == "*" {
            None
        } else {
            Some(
                Facility::from_keyword(facility_tok)
                    .ok_or_else(|| invalid(format!("facility not parsed: '{facility_tok}'")))?,
            )
        };

        let mut level = None;
        let mut level_invert = false;
        if sep == Some('.') {
            if let Some(stripped) = rest.strip_prefix('!') {
                level_invert = true;
                rest = stripped;
            }
            let (level_tok, next_sep) = next_token(&mut rest, &['.', ',']);
            level = if level_tok == "*" {
                None
            } else {
                Some(
                    LogLevel::from_keyword(level_tok)
                        .ok_or_else(|| invalid(format!("level not parsed: '{level_tok}'")))?,
                )
            };
            sep = next_sep;
        }

        let mut program = None;
        if sep == Some('.') {
            let (program_tok, next_sep) = next_token(&mut rest, &['.', ',']);
            if !program_tok.is_empty() {
                program = Some(program_tok.to_owned());
            }
            sep = next_sep;
        }

        if sep != Some(',') {
            return Err(invalid("expected ',' after filter".to_owned()));
        }

        let mut omit = false;
        if let Some(stripped) = rest.strip_prefix('-') {
            omit = true;
            rest = stripped;
        }

        let (output_tok, trailing) = next_token(&mut rest, &['.', ',']);
        let output_index =
            self.find_output(output_tok)
                .ok_or_else(|| ConfigError::UnknownOutput {
                    context: context.to_owned(),
                    rule: rule_key.to_owned(),
                    output: output_tok.to_owned(),
                })?;

        if trailing.is_some() {
            return Err(invalid("unexpected data after output".to_owned()));
        }

        Ok(RouteRule {
            facility,
            level,
            level_invert,
            program,
            output_index,
            omit,
        })
    }
}

/// 구분자까지의 토큰을 잘라냅니다.
///
/// 반환값은 (토큰, 만난 구분자)이며, 구분자는 소비됩니다.
/// 구분자를 만나지 못하면 나머지 전체가 토큰이 되고 구분자는 `None`입니다.
fn next_token<'a>(s: &mut &'a str, terminators: &[char]) -> (&'a str, Option<char>) {
    match s.find(|c| terminators.contains(&c)) {
        Some(pos) => {
            let token = &s[..pos];
            let sep = s[pos..].chars().next();
            *s = &s[pos + sep.map_or(0, char::len_utf8)..];
            (token, sep)
        }
        None => {
            let token = *s;
            *s = "";
            (token, None)
        }
    }
}
