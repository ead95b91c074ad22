use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FoldError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(FoldError::render("x").to_string().contains("render error:"));
    assert!(FoldError::store("x").to_string().contains("store error:"));
    assert!(FoldError::resume("x").to_string().contains("resume error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FoldError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn io_errors_convert_into_other() {
    let err: FoldError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, FoldError::Other(_)));
    assert!(err.to_string().contains("gone"));
}
