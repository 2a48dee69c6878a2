//! 규칙 분류기 -- (컨텍스트, facility, 레벨, 프로그램)을 출력 집합으로 매핑
//!
//! 컨텍스트의 규칙을 선언 순서대로 평가합니다. 각 규칙은 세 가지
//! 필터(facility, 레벨, 프로그램)를 모두 통과해야 매칭됩니다.
//!
//! # 우선순위
//! 출력별로 첫 매칭이 승리합니다. omit 규칙이 먼저 매칭된 출력은
//! 이후의 긍정 매칭으로 되살아나지 않으며, 긍정 매칭이 먼저 일어난
//! 출력은 이후의 omit 매칭으로 취소되지 않습니다.

use pmlogd_core::config::{RouteRule, RoutingConfig};
use pmlogd_core::types::{Facility, LogLevel};

/// 메시지를 분류하여 기록 대상 출력 인덱스 목록을 반환합니다.
///
/// 알 수 없는 컨텍스트 이름은 `<global>`로 대체됩니다. 반환 목록은
/// 규칙 순서를 따르며 중복이 없습니다. 빈 목록은 메시지를 버린다는
/// 뜻입니다.
pub fn classify(
    config: &RoutingConfig,
    context_name: &str,
    facility: Facility,
    level: LogLevel,
    program: &str,
) -> Vec<usize> {
    let Some(context) = config.resolve_context(context_name) else {
        return Vec::new();
    };

    let mut targets: Vec<usize> = Vec::new();
    let mut suppressed = vec![false; config.outputs().len()];

    for rule in &context.rules {
        if !rule_matches(rule, facility, level, program) {
            continue;
        }

        let index = rule.output_index;
        if index >= suppressed.len() {
            continue;
        }

        if rule.omit {
            suppressed[index] = true;
        } else if !suppressed[index] && !targets.contains(&index) {
            targets.push(index);
        }
    }

    targets
}

/// 규칙의 세 필터를 모두 검사합니다.
fn rule_matches(rule: &RouteRule, facility: Facility, level: LogLevel, program: &str) -> bool {
    if let Some(rule_facility) = rule.facility {
        if rule_facility != facility {
            return false;
        }
    }

    if let Some(rule_level) = rule.level {
        let equal = rule_level == level;
        if rule.level_invert {
            if equal {
                return false;
            }
        } else if !equal {
            return false;
        }
    }

    if let Some(rule_program) = &rule.program {
        if rule_program != program {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmlogd_core::keyfile::KeyFile;

    fn config(text: &str) -> RoutingConfig {
        RoutingConfig::from_keyfile(&KeyFile::parse(text).unwrap()).unwrap()
    }

    fn two_output_config(rules: &str) -> RoutingConfig {
        config(&format!(
            "[OUTPUT=stdlog]\nFile=/var/log/messages\n\
             [OUTPUT=kernlog]\nFile=/var/log/kern.log\n\
             [CONTEXT=<global>]\n{rules}\n"
        ))
    }

    #[test]
    fn wildcard_rule_matches_everything() {
        let cfg = two_output_config("Rule1=*.*,stdlog");
        let targets = classify(&cfg, "<global>", Facility::User, LogLevel::Info, "a");
        assert_eq!(targets, vec![0]);
    }

    #[test]
    fn facility_filter() {
        let cfg = two_output_config("Rule1=kern.*,kernlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::Kern, LogLevel::Error, "k"),
            vec![1]
        );
        assert!(classify(&cfg, "<global>", Facility::User, LogLevel::Error, "k").is_empty());
    }

    #[test]
    fn level_filter_exact() {
        let cfg = two_output_config("Rule1=*.err,stdlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::User, LogLevel::Error, "a"),
            vec![0]
        );
        assert!(classify(&cfg, "<global>", Facility::User, LogLevel::Info, "a").is_empty());
    }

    #[test]
    fn level_filter_inverted() {
        let cfg = two_output_config("Rule1=user.!info,stdlog");
        assert!(classify(&cfg, "<global>", Facility::User, LogLevel::Info, "a").is_empty());
        assert_eq!(
            classify(&cfg, "<global>", Facility::User, LogLevel::Error, "a"),
            vec![0]
        );
    }

    #[test]
    fn program_filter_is_exact() {
        let cfg = two_output_config("Rule1=user.info.sshd,stdlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::User, LogLevel::Info, "sshd"),
            vec![0]
        );
        assert!(classify(&cfg, "<global>", Facility::User, LogLevel::Info, "sshd2").is_empty());
        assert!(classify(&cfg, "<global>", Facility::User, LogLevel::Info, "SSHD").is_empty());
    }

    #[test]
    fn omit_before_add_suppresses() {
        let cfg = two_output_config("Rule1=kern.*,-stdlog\nRule2=*.*,stdlog");
        // kern 메시지는 Rule1이 stdlog를 억제하므로 Rule2가 되살리지 못함
        assert!(classify(&cfg, "<global>", Facility::Kern, LogLevel::Error, "k").is_empty());
        // 다른 facility는 Rule1에 매칭되지 않으므로 정상 기록
        assert_eq!(
            classify(&cfg, "<global>", Facility::User, LogLevel::Error, "u"),
            vec![0]
        );
    }

    #[test]
    fn add_before_omit_is_not_rescinded() {
        let cfg = two_output_config("Rule1=*.*,stdlog\nRule2=kern.*,-stdlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::Kern, LogLevel::Error, "k"),
            vec![0]
        );
    }

    #[test]
    fn duplicate_positive_matches_deduplicated() {
        let cfg = two_output_config("Rule1=*.*,stdlog\nRule2=kern.*,stdlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::Kern, LogLevel::Error, "k"),
            vec![0]
        );
    }

    #[test]
    fn targets_preserve_rule_order() {
        let cfg = two_output_config("Rule1=kern.*,kernlog\nRule2=*.*,stdlog");
        assert_eq!(
            classify(&cfg, "<global>", Facility::Kern, LogLevel::Error, "k"),
            vec![1, 0]
        );
    }

    #[test]
    fn unknown_context_falls_back_to_global() {
        let cfg = two_output_config("Rule1=*.*,stdlog");
        assert_eq!(
            classify(&cfg, "nonexistent", Facility::User, LogLevel::Info, "a"),
            vec![0]
        );
    }

    #[test]
    fn named_context_takes_precedence_over_global() {
        let cfg = config(
            "[OUTPUT=stdlog]\nFile=/var/log/messages\n\
             [OUTPUT=weblog]\nFile=/var/log/web.log\n\
             [CONTEXT=<global>]\nRule1=*.*,stdlog\n\
             [CONTEXT=browser]\nRule1=*.*,weblog\n",
        );
        assert_eq!(
            classify(&cfg, "browser", Facility::User, LogLevel::Info, "w"),
            vec![1]
        );
        assert_eq!(
            classify(&cfg, "other", Facility::User, LogLevel::Info, "w"),
            vec![0]
        );
    }

    #[test]
    fn context_with_no_rules_drops_message() {
        let cfg = config(
            "[OUTPUT=stdlog]\nFile=/var/log/messages\n\
             [CONTEXT=<global>]\nRule1=*.*,stdlog\n\
             [CONTEXT=quiet]\n",
        );
        assert!(classify(&cfg, "quiet", Facility::User, LogLevel::Info, "q").is_empty());
    }

    #[test]
    fn classify_is_idempotent() {
        let cfg = two_output_config("Rule1=*.*,stdlog\nRule2=kern.err,kernlog\nRule3=kern.*,-stdlog");
        for (facility, level) in [
            (Facility::Kern, LogLevel::Error),
            (Facility::User, LogLevel::Info),
            (Facility::Daemon, LogLevel::Emergency),
        ] {
            let first = classify(&cfg, "<global>", facility, level, "p");
            let second = classify(&cfg, "<global>", facility, level, "p");
            assert_eq!(first, second);
        }
    }

    // Property-based tests using proptest
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_facility() -> impl Strategy<Value = Facility> {
            prop::sample::select(vec![
                Facility::Kern,
                Facility::User,
                Facility::Mail,
                Facility::Daemon,
                Facility::Auth,
                Facility::Syslog,
                Facility::Cron,
                Facility::Local0,
                Facility::Local7,
            ])
        }

        fn any_level() -> impl Strategy<Value = LogLevel> {
            (0u8..=7).prop_map(|code| LogLevel::from_code(code).unwrap())
        }

        proptest! {
            #[test]
            fn classify_never_panics(
                context in ".{0,40}",
                program in ".{0,40}",
                facility in any_facility(),
                level in any_level(),
            ) {
                let cfg = two_output_config(
                    "Rule1=*.*,stdlog\nRule2=kern.err,kernlog\nRule3=user.!debug,-stdlog",
                );
                let targets = classify(&cfg, &context, facility, level, &program);
                // 결과는 항상 유효한 인덱스이며 중복이 없어야 함
                for &index in &targets {
                    prop_assert!(index < cfg.outputs().len());
                }
                let mut dedup = targets.clone();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), targets.len());
            }

            #[test]
            fn classify_is_idempotent_for_any_input(
                facility in any_facility(),
                level in any_level(),
                program in "[a-z]{0,12}",
            ) {
                let cfg = two_output_config(
                    "Rule1=*.*,stdlog\nRule2=kern.err,kernlog\nRule3=user.!debug,-stdlog",
                );
                let first = classify(&cfg, "<global>", facility, level, &program);
                let second = classify(&cfg, "<global>", facility, level, &program);
                prop_assert_eq!(first, second);
            }
        }
    }
}
