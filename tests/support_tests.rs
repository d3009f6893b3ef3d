//! Records, configuration, credentials and export formats

use research_kpi::auth::{AdminCredential, hash_password};
use research_kpi::config::{DuplicatePolicy, HeadcountMode};
use research_kpi::kpi::{GroupKind, KpiRow};
use research_kpi::{JournalTier, KpiError, PublicationKey, Settings, YearFilter, report};

#[test]
fn test_tier_labels() {
    for (label, tier) in [
        ("TCI Group 1", JournalTier::TciGroup1),
        ("tci1", JournalTier::TciGroup1),
        ("TCI-2", JournalTier::TciGroup2),
        (" TCI group 2 ", JournalTier::TciGroup2),
        ("Scopus", JournalTier::Scopus),
        ("Scopus Q3", JournalTier::Scopus),
        ("Scopus Q1-4", JournalTier::Scopus),
    ] {
        assert_eq!(JournalTier::parse(label), Some(tier), "{}", label);
    }
    assert_eq!(JournalTier::parse("TCI Group 3"), None);
    assert_eq!(JournalTier::parse("Web of Science"), None);

    let scores: Vec<f64> = JournalTier::ALL.iter().map(|t| t.score()).collect();
    assert_eq!(scores, vec![1.0, 0.8, 0.6]);
}

#[test]
fn test_publication_label_keeps_separators_in_title() {
    let key = PublicationKey {
        title: "Risk | Reward in SMEs".to_string(),
        year: Some(2567),
        journal_tier: Some("Scopus Q1-4".to_string()),
    };
    let label = key.label();
    assert_eq!(label, "2567 | Risk | Reward in SMEs | Scopus Q1-4");
    assert_eq!(PublicationKey::from_label(&label), Some(key));

    assert_eq!(PublicationKey::from_label("not a label"), None);
    assert_eq!(PublicationKey::from_label("abc | Title | Scopus"), None);
    assert_eq!(PublicationKey::from_label("2567 |  | Scopus"), None);

    let blank_tier = PublicationKey::from_label("2567 | Untiered | ").unwrap();
    assert_eq!(blank_tier.journal_tier.as_deref(), Some(""));
    assert_eq!(blank_tier.year, Some(2567));
}

#[test]
fn test_year_filter_parse() {
    assert_eq!(YearFilter::parse(None), YearFilter::All);
    assert_eq!(YearFilter::parse(Some("All")), YearFilter::All);
    assert_eq!(YearFilter::parse(Some(" 2567 ")), YearFilter::Year(2567));
    assert_eq!(YearFilter::parse(Some("soon")), YearFilter::All);
    assert!(YearFilter::Year(2567).includes(2567));
    assert!(!YearFilter::Year(2567).includes(2566));
}

#[test]
fn test_empty_config_uses_defaults() {
    let settings = Settings::from_toml("").unwrap();
    assert_eq!(settings.server.bind, "127.0.0.1:8501");
    assert_eq!(settings.store.staff_sheet, "masters");
    assert_eq!(settings.store.columns.staff_name, "Name-surname");
    assert_eq!(settings.store.cache_ttl_secs, 600);
    assert!(settings.kpi.clamp);
    assert_eq!(settings.kpi.headcount, HeadcountMode::Roster);
    assert_eq!(settings.kpi.duplicate_titles, DuplicatePolicy::Reject);
    assert_eq!(settings.auth.session_hours, 12);
}

#[test]
fn test_config_overrides() {
    let settings = Settings::from_toml(
        r#"
        [store]
        workbook = "data/research.xlsx"
        cache_ttl_secs = 30

        [store.columns]
        staff_name = "Full name"

        [kpi]
        clamp = false
        headcount = "fixed"
        duplicate_titles = "allow"

        [kpi.fixed_programs]
        BBA = 12
        "#,
    )
    .unwrap();

    assert_eq!(settings.store.workbook.to_str(), Some("data/research.xlsx"));
    assert_eq!(settings.store.columns.staff_name, "Full name");
    assert_eq!(settings.store.columns.title, "title");
    assert!(!settings.kpi.clamp);
    assert_eq!(settings.kpi.headcount, HeadcountMode::Fixed);
    assert_eq!(settings.kpi.duplicate_titles, DuplicatePolicy::Allow);
    assert_eq!(settings.kpi.fixed_programs.get("BBA"), Some(&12));
}

#[test]
fn test_invalid_config_is_rejected() {
    for toml in [
        "[kpi]\nduplicate_titles = \"sometimes\"",
        "[kpi.fixed_faculties]\nNursing = 0",
        "[store]\nstaff_sheet = \"data\"\nresearch_sheet = \"data\"",
    ] {
        let err = Settings::from_toml(toml).unwrap_err();
        assert!(matches!(err, KpiError::Config(_)), "{}", toml);
    }
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.store.research_sheet, "research");
}

#[test]
fn test_admin_credential() {
    let hash = hash_password("s3cret").unwrap();
    let credential = AdminCredential::new(Some(hash)).unwrap();
    assert!(credential.is_configured());
    assert!(credential.verify("s3cret"));
    assert!(!credential.verify("S3cret"));
    assert!(!credential.verify(""));

    let unset = AdminCredential::new(Some("  ".to_string())).unwrap();
    assert!(!unset.is_configured());
    assert!(!unset.verify("anything"));

    assert!(matches!(
        AdminCredential::new(Some("plaintext".to_string())),
        Err(KpiError::Config(_))
    ));
    assert!(hash_password("").is_err());
}

#[cfg(feature = "web")]
#[test]
fn test_sessions_expire_and_revoke() {
    use research_kpi::auth::SessionStore;
    use std::time::Duration;

    let sessions = SessionStore::new(Duration::from_secs(60));
    let id = sessions.create();
    assert!(sessions.validate(&id));
    assert!(!sessions.validate("forged"));
    sessions.revoke(&id);
    assert!(!sessions.validate(&id));

    let expired = SessionStore::new(Duration::ZERO);
    let id = expired.create();
    assert!(!expired.validate(&id));
}

#[test]
fn test_csv_quotes_awkward_fields() {
    let rows = vec![KpiRow {
        kind: GroupKind::Program,
        group: "Hospitality, Tourism".to_string(),
        faculty: Some("The \"New\" Faculty".to_string()),
        headcount: 9,
        target: 20,
        publications: 1,
        total_score: 1.0,
        kpi: 2.78,
    }];
    let csv = report::to_csv(&rows);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "program,\"Hospitality, Tourism\",\"The \"\"New\"\" Faculty\",9,20,1,1.00,2.78"
    );
}
