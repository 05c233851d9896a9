use super::*;

#[test]
fn dummy_is_recognized() {
    assert!(SrcLoc::dummy().is_dummy());
    assert!(!SrcLoc::new(0, 1).is_dummy());
}

#[test]
fn display_names_file_and_line() {
    let loc = SrcLoc::new(2, 17);
    assert_eq!(loc.to_string(), "file 2, line 17");
}
