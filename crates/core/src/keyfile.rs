//! 그룹 키-값 파일 파서 -- `[GROUP]` / `key=value` 형식 해석
//!
//! pmlogd.conf는 `[OUTPUT=name]`, `[CONTEXT=name]` 그룹 아래에
//! `key=value` 줄이 나열되는 형식입니다. 이 모듈은 형식만 해석하고,
//! 그룹의 의미는 [`config`](crate::config) 모듈이 부여합니다.
//!
//! # 문법
//! - `[group]` — 그룹 헤더. 이름은 비어 있을 수 없습니다.
//! - `key=value` — 첫 번째 `=`에서 분리, 양쪽 공백 제거.
//! - `#` 또는 `;`로 시작하는 줄과 빈 줄은 무시합니다.
//! - 같은 그룹에서 키가 중복되면 마지막 값이 우선합니다.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// 파싱된 키-값 파일
#[derive(Debug, Clone)]
pub struct KeyFile {
    groups: Vec<Group>,
}

/// 하나의 `[...]` 그룹과 그 아래 키-값 엔트리
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    entries: Vec<(String, String)>,
}

impl Group {
    /// 그룹 이름 (대괄호 안 문자열 전체)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 키의 값을 조회합니다. 중복 키는 마지막 값이 우선합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 엔트리 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 엔트리가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyFile {
    /// 파일에서 키-값 파일을 읽고 파싱합니다.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::FileUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// 문자열을 파싱합니다.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut groups: Vec<Group> = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        reason: "unterminated group header".to_owned(),
                    });
                };
                if name.is_empty() {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        reason: "empty group name".to_owned(),
                    });
                }
                groups.push(Group {
                    name: name.to_owned(),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    reason: format!("expected 'key=value', got '{line}'"),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    reason: "empty key".to_owned(),
                });
            }

            let Some(group) = groups.last_mut() else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    reason: format!("key '{key}' outside of any group"),
                });
            };
            group
                .entries
                .push((key.to_owned(), value.trim().to_owned()));
        }

        Ok(Self { groups })
    }

    /// 등장 순서대로 그룹을 순회합니다.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// 그룹 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// 그룹이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_groups() {
        let kf = KeyFile::parse(
            "[OUTPUT=stdlog]\nFile=/var/log/messages\nMaxSize=1M\n\n[CONTEXT=<global>]\nRule1=*.*,stdlog\n",
        )
        .unwrap();
        assert_eq!(kf.len(), 2);

        let groups: Vec<_> = kf.groups().collect();
        assert_eq!(groups[0].name(), "OUTPUT=stdlog");
        assert_eq!(groups[0].get("File"), Some("/var/log/messages"));
        assert_eq!(groups[0].get("MaxSize"), Some("1M"));
        assert_eq!(groups[1].get("Rule1"), Some("*.*,stdlog"));
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let kf = KeyFile::parse("# comment\n; another\n\n[G]\nk=v\n# inside group\n").unwrap();
        assert_eq!(kf.len(), 1);
        let group = kf.groups().next().unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.get("k"), Some("v"));
    }

    #[test]
    fn whitespace_trimmed_around_key_and_value() {
        let kf = KeyFile::parse("[G]\n  key  =  value with spaces  \n").unwrap();
        let group = kf.groups().next().unwrap();
        assert_eq!(group.get("key"), Some("value with spaces"));
    }

    #[test]
    fn value_may_contain_equals() {
        let kf = KeyFile::parse("[G]\nk=a=b=c\n").unwrap();
        assert_eq!(kf.groups().next().unwrap().get("k"), Some("a=b=c"));
    }

    #[test]
    fn value_may_be_empty() {
        let kf = KeyFile::parse("[G]\nk=\n").unwrap();
        assert_eq!(kf.groups().next().unwrap().get("k"), Some(""));
    }

    #[test]
    fn duplicate_key_last_wins() {
        let kf = KeyFile::parse("[G]\nk=first\nk=second\n").unwrap();
        assert_eq!(kf.groups().next().unwrap().get("k"), Some("second"));
    }

    #[test]
    fn duplicate_groups_kept_in_order() {
        let kf = KeyFile::parse("[G]\na=1\n[G]\nb=2\n").unwrap();
        assert_eq!(kf.len(), 2);
    }

    #[test]
    fn unterminated_group_header_fails() {
        let err = KeyFile::parse("[OUTPUT=stdlog\nFile=/x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn empty_group_name_fails() {
        let err = KeyFile::parse("[]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn key_outside_group_fails() {
        let err = KeyFile::parse("orphan=1\n[G]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn line_without_separator_fails() {
        let err = KeyFile::parse("[G]\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn empty_input_is_empty_keyfile() {
        let kf = KeyFile::parse("").unwrap();
        assert!(kf.is_empty());
    }

    #[test]
    fn load_missing_file_fails() {
        let err = KeyFile::load(Path::new("/nonexistent/pmlogd.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::FileUnreadable { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmlogd.conf");
        std::fs::write(&path, "[OUTPUT=stdlog]\nFile=/tmp/x.log\n").unwrap();

        let kf = KeyFile::load(&path).unwrap();
        assert_eq!(kf.len(), 1);
        assert_eq!(kf.groups().next().unwrap().get("File"), Some("/tmp/x.log"));
    }
}
