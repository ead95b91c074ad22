use super::*;

#[test]
fn empty_command_skips() {
    assert_eq!(run_build(&BuildConfig::default()).unwrap(), BuildOutcome::Skipped);
}

#[test]
fn missing_program_is_an_error() {
    let cfg = BuildConfig {
        command: vec!["framefold-no-such-build-tool".into()],
    };
    assert!(matches!(run_build(&cfg), Err(FoldError::Render(_))));
}

#[cfg(unix)]
#[test]
fn captures_output_and_status() {
    let ok = BuildConfig {
        command: vec!["sh".into(), "-c".into(), "echo built".into()],
    };
    assert_eq!(
        run_build(&ok).unwrap(),
        BuildOutcome::Succeeded {
            output: "built\n".into()
        }
    );

    let bad = BuildConfig {
        command: vec!["sh".into(), "-c".into(), "echo error C2065; exit 2".into()],
    };
    match run_build(&bad).unwrap() {
        BuildOutcome::Failed { code, output } => {
            assert_eq!(code, Some(2));
            assert!(output.contains("C2065"));
        }
        other => panic!("unexpected {other:?}"),
    }
}
