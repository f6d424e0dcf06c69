use super::*;
use chrono::Utc;

#[test]
fn enum_roundtrips() {
    assert_eq!(
        BannerKind::try_from(1).expect("valid banner kind"),
        BannerKind::Popup
    );
    assert_eq!(BannerKind::Mid.as_i32(), 3);
    assert_eq!("bottom".parse::<BannerKind>().expect("kind"), BannerKind::Bottom);

    assert_eq!(
        EmployeeStatus::try_from(2).expect("valid employee status"),
        EmployeeStatus::Disabled
    );
    assert_eq!(EmployeeStatus::Active.as_i32(), 1);

    assert_eq!(
        LinkTarget::try_from(2).expect("valid link target"),
        LinkTarget::NewWindow
    );
    assert_eq!(LinkTarget::SameWindow.as_str(), "same_window");

    assert_eq!(
        ContentStatus::try_from(2).expect("valid content status"),
        ContentStatus::Hidden
    );
    assert_eq!(ContentStatus::Published.as_i32(), 1);
}

#[test]
fn enum_parse_invalid() {
    assert!(BannerKind::try_from(99).is_err());
    assert!(EmployeeStatus::try_from(0).is_err());
    assert!(LinkTarget::try_from(3).is_err());
    assert!(ContentStatus::try_from(-1).is_err());
    let err = "sidebar".parse::<BannerKind>().expect_err("unknown kind");
    assert_eq!(err.to_string(), "invalid banner_kind value: sidebar");
}

fn settings() -> SiteSettings {
    SiteSettings {
        site_name: "Firm".to_string(),
        domain: None,
        contact_email: None,
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        smtp_from: None,
        smtp_tls_mode: "starttls".to_string(),
        jwt_expiry_minutes: 120,
        cors_origins: Vec::new(),
        blocked_ips: vec!["10.0.0.9".to_string()],
        blocked_bots: vec!["AhrefsBot".to_string(), " ".to_string()],
        updated_at: Utc::now(),
    }
}

#[test]
fn bot_markers_match_case_insensitively() {
    let settings = settings();
    assert!(settings.is_bot("Mozilla/5.0 (compatible; ahrefsbot/7.0)"));
    assert!(!settings.is_bot("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"));
}

#[test]
fn blocked_ip_matches_exactly() {
    let settings = settings();
    assert!(settings.is_ip_blocked("10.0.0.9"));
    assert!(!settings.is_ip_blocked("10.0.0.90"));
}

#[test]
fn smtp_requires_host_and_sender() {
    let mut settings = settings();
    assert!(!settings.smtp_configured());
    settings.smtp_host = Some("smtp.example.com".to_string());
    assert!(!settings.smtp_configured());
    settings.smtp_from = Some("noreply@example.com".to_string());
    assert!(settings.smtp_configured());
}
