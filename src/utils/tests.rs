use super::*;

#[test]
fn safe_filename_replaces_dangerous_chars() {
    assert_eq!(safe_filename("a/b\\c:d*e"), "a_b_c_d_e");
    assert_eq!(safe_filename("report<>|.txt"), "report___.txt");
}

#[test]
fn expand_home_tilde_slash() {
    let result = expand_home("~/share/out");
    let home = dirs::home_dir().unwrap();
    assert_eq!(result, home.join("share/out"));
}

#[test]
fn expand_home_absolute_untouched() {
    assert_eq!(
        expand_home("/opt/napcat/data/share"),
        PathBuf::from("/opt/napcat/data/share")
    );
}

#[test]
fn atomic_write_creates_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("sessions.json");
    atomic_write(&path, "{}").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn atomic_write_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("sessions.json");
    atomic_write(&path, "first").unwrap();
    atomic_write(&path, "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn truncate_chars_counts_code_points() {
    let (cut, truncated) = truncate_chars("磁盘使用率", 2);
    assert_eq!(cut, "磁盘");
    assert!(truncated);

    let (whole, truncated) = truncate_chars("df -h", 10);
    assert_eq!(whole, "df -h");
    assert!(!truncated);
}

#[test]
fn truncate_chars_exact_length_is_not_truncated() {
    let (cut, truncated) = truncate_chars("abc", 3);
    assert_eq!(cut, "abc");
    assert!(!truncated);
}
