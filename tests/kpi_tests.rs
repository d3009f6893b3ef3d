//! Join, aggregation and gap planning over in-memory tables

use research_kpi::config::{HeadcountMode, KpiSettings};
use research_kpi::gap::{self, GapPlan};
use research_kpi::join;
use research_kpi::kpi::{self, GroupKind, KpiRow};
use research_kpi::{Dashboard, JournalTier, PublicationRecord, StaffRecord, YearFilter};

fn staff(name: &str, program: &str, faculty: &str) -> StaffRecord {
    StaffRecord::create(name, program, faculty)
}

fn paper(title: &str, year: i32, tier: JournalTier, author: &str) -> PublicationRecord {
    PublicationRecord::create(title, year, tier, author)
}

fn roster(program: &str, faculty: &str, count: usize) -> Vec<StaffRecord> {
    (1..=count)
        .map(|i| staff(&format!("{} Lecturer {}", program, i), program, faculty))
        .collect()
}

fn programs(
    staff: &[StaffRecord],
    publications: &[PublicationRecord],
    settings: &KpiSettings,
) -> Vec<KpiRow> {
    let outcome = join::resolve(staff, publications);
    kpi::aggregate(
        GroupKind::Program,
        staff,
        &outcome.rows,
        YearFilter::All,
        settings,
    )
}

fn find<'a>(rows: &'a [KpiRow], group: &str) -> &'a KpiRow {
    rows.iter()
        .find(|r| r.group == group)
        .unwrap_or_else(|| panic!("no row for {}", group))
}

#[test]
fn test_coauthors_in_same_program_count_once() {
    let staff = roster("BBA", "Business", 10);
    let publications = vec![
        paper("Tourism demand", 2567, JournalTier::Scopus, "BBA Lecturer 1"),
        paper("Tourism demand", 2567, JournalTier::Scopus, "BBA Lecturer 2"),
        paper("Tourism demand", 2567, JournalTier::Scopus, "BBA Lecturer 3"),
    ];

    let rows = programs(&staff, &publications, &KpiSettings::default());
    let bba = find(&rows, "BBA");
    assert_eq!(bba.publications, 1);
    assert_eq!(bba.total_score, 1.0);
    assert_eq!(bba.kpi, 2.5);
}

#[test]
fn test_coauthors_in_different_programs_each_count() {
    let mut staff = roster("BBA", "Business", 10);
    staff.extend(roster("MBA", "Business", 5));
    let publications = vec![
        paper("Shared paper", 2567, JournalTier::TciGroup1, "BBA Lecturer 1"),
        paper("Shared paper", 2567, JournalTier::TciGroup1, "MBA Lecturer 1"),
    ];

    let rows = programs(&staff, &publications, &KpiSettings::default());
    assert_eq!(find(&rows, "BBA").total_score, 0.8);
    assert_eq!(find(&rows, "MBA").total_score, 0.8);

    let outcome = join::resolve(&staff, &publications);
    let faculties = kpi::aggregate(
        GroupKind::Faculty,
        &staff,
        &outcome.rows,
        YearFilter::All,
        &KpiSettings::default(),
    );
    let business = find(&faculties, "Business");
    assert_eq!(business.publications, 1);
    assert_eq!(business.total_score, 0.8);
    assert_eq!(business.faculty, None);
}

#[test]
fn test_every_roster_program_is_listed() {
    let mut staff = roster("BBA", "Business", 9);
    staff.extend(roster("MPH", "Public Health", 4));
    staff.push(staff_with_blank_program());
    let publications = vec![paper("Only BBA", 2567, JournalTier::Scopus, "BBA Lecturer 1")];

    let rows = programs(&staff, &publications, &KpiSettings::default());
    let groups: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
    assert_eq!(groups, vec!["BBA", "MPH"]);

    let mph = find(&rows, "MPH");
    assert_eq!(mph.kpi, 0.0);
    assert_eq!(mph.publications, 0);
    assert_eq!(mph.target, 40);
    assert_eq!(mph.faculty.as_deref(), Some("Public Health"));
}

fn staff_with_blank_program() -> StaffRecord {
    staff("Visiting Scholar", "-", "Business")
}

#[test]
fn test_clamped_kpi_stays_in_range() {
    let staff = roster("BBA", "Business", 2);
    let publications: Vec<PublicationRecord> = (0..20)
        .map(|i| paper(&format!("Paper {}", i), 2567, JournalTier::Scopus, "BBA Lecturer 1"))
        .collect();

    let rows = programs(&staff, &publications, &KpiSettings::default());
    for row in &rows {
        assert!(row.kpi >= 0.0 && row.kpi <= kpi::KPI_MAX, "{:?}", row);
    }
    assert_eq!(find(&rows, "BBA").kpi, 5.0);
}

#[test]
fn test_padded_names_still_match() {
    let staff = vec![StaffRecord {
        name: "  Somchai Jaidee ".to_string(),
        program: " BBA".to_string(),
        faculty: "Business ".to_string(),
    }];
    let mut row = paper("Padded", 2567, JournalTier::Scopus, "x");
    row.author_name = "Somchai Jaidee   ".to_string();

    let outcome = join::resolve(&staff, &[row]);
    assert!(outcome.mismatches.is_empty());
    assert!(outcome.rows[0].matched);
    assert_eq!(outcome.rows[0].program.as_deref(), Some("BBA"));
    assert_eq!(outcome.rows[0].faculty.as_deref(), Some("Business"));
}

#[test]
fn test_name_match_is_case_sensitive() {
    let staff = vec![staff("Somchai Jaidee", "BBA", "Business")];
    let publications = vec![
        paper("One", 2567, JournalTier::Scopus, "somchai jaidee"),
        paper("Two", 2567, JournalTier::Scopus, "Someone Else"),
        paper("Three", 2566, JournalTier::Scopus, "Someone Else"),
    ];

    let outcome = join::resolve(&staff, &publications);
    assert_eq!(outcome.mismatches.len(), 3);
    assert_eq!(
        outcome.unmatched_authors(),
        vec!["Someone Else".to_string(), "somchai jaidee".to_string()]
    );
    assert!(outcome.rows.iter().all(|r| !r.matched && r.program.is_none()));
}

#[test]
fn test_duplicate_roster_name_uses_first_entry() {
    let staff = vec![
        staff("Anong Suksai", "BBA", "Business"),
        staff("Anong Suksai", "MBA", "Business"),
    ];
    let publications = vec![paper("P", 2567, JournalTier::Scopus, "Anong Suksai")];
    let outcome = join::resolve(&staff, &publications);
    assert_eq!(outcome.rows[0].program.as_deref(), Some("BBA"));
}

#[test]
fn test_bba_single_scopus_paper() {
    let staff = roster("BBA", "Business", 9);
    let publications = vec![paper("Hotel service", 2567, JournalTier::Scopus, "BBA Lecturer 4")];

    let rows = programs(&staff, &publications, &KpiSettings::default());
    let bba = find(&rows, "BBA");
    assert_eq!(bba.headcount, 9);
    assert_eq!(bba.target, 20);
    assert_eq!(bba.kpi, 2.78);
}

#[test]
fn test_doctoral_program_clamps_at_five() {
    let staff = roster("Ph.D-Admin", "Education", 3);
    let publications = vec![
        paper("A", 2567, JournalTier::Scopus, "Ph.D-Admin Lecturer 1"),
        paper("B", 2567, JournalTier::Scopus, "Ph.D-Admin Lecturer 2"),
        paper("C", 2567, JournalTier::Scopus, "Ph.D-Admin Lecturer 3"),
        paper("D", 2566, JournalTier::TciGroup2, "Ph.D-Admin Lecturer 1"),
    ];

    let rows = programs(&staff, &publications, &KpiSettings::default());
    let phd = find(&rows, "Ph.D-Admin");
    assert_eq!(phd.target, 60);
    assert!((phd.total_score - 3.6).abs() < 1e-9);
    assert_eq!(phd.kpi, 5.0);

    let unclamped = KpiSettings {
        clamp: false,
        ..KpiSettings::default()
    };
    let rows = programs(&staff, &publications, &unclamped);
    assert_eq!(find(&rows, "Ph.D-Admin").kpi, 10.0);
}

#[test]
fn test_year_filter_limits_aggregation() {
    let staff = roster("BBA", "Business", 9);
    let publications = vec![
        paper("Old", 2565, JournalTier::Scopus, "BBA Lecturer 1"),
        paper("New", 2567, JournalTier::Scopus, "BBA Lecturer 1"),
    ];
    let outcome = join::resolve(&staff, &publications);
    let rows = kpi::aggregate(
        GroupKind::Program,
        &staff,
        &outcome.rows,
        YearFilter::Year(2567),
        &KpiSettings::default(),
    );
    assert_eq!(find(&rows, "BBA").publications, 1);
    assert_eq!(find(&rows, "BBA").kpi, 2.78);
}

#[test]
fn test_fixed_headcount_overrides_roster() {
    let staff = roster("BBA", "Business", 9);
    let publications = vec![paper("P", 2567, JournalTier::Scopus, "BBA Lecturer 1")];
    let mut settings = KpiSettings {
        headcount: HeadcountMode::Fixed,
        ..KpiSettings::default()
    };
    settings.fixed_programs.insert("BBA".to_string(), 18);

    let rows = programs(&staff, &publications, &settings);
    let bba = find(&rows, "BBA");
    assert_eq!(bba.headcount, 18);
    assert_eq!(bba.kpi, 1.39);
}

#[test]
fn test_targets() {
    assert_eq!(kpi::program_target("Ph.D-Admin"), 60);
    assert_eq!(kpi::program_target("M.Ed-LMS"), 40);
    assert_eq!(kpi::program_target(" MBA "), 40);
    assert_eq!(kpi::program_target("BBA"), 20);
    assert_eq!(kpi::faculty_target("Nursing"), 30);
    assert_eq!(kpi::faculty_target("Public Health"), 30);
    assert_eq!(kpi::faculty_target("Education"), 20);
}

#[test]
fn test_zero_headcount_is_treated_as_one() {
    assert_eq!(kpi::kpi_score(0.2, 0, 20, true), 5.0);
    assert_eq!(kpi::kpi_score(0.1, 0, 20, true), 2.5);
}

#[test]
fn test_gap_at_zero_kpi_is_full_requirement() {
    let plan = gap::plan(0.0, 9, 20);
    assert!((plan.gap() - 1.8).abs() < 1e-9);
    assert!((plan.required_total() - (20.0 * 9.0) / 100.0).abs() < 1e-9);

    match plan {
        GapPlan::Needed { papers, .. } => {
            let counts: Vec<u32> = papers.iter().map(|p| p.papers).collect();
            assert_eq!(counts, vec![2, 3, 3]);
            assert_eq!(papers[0].tier, JournalTier::Scopus);
        }
        GapPlan::Achieved { .. } => panic!("expected a gap"),
    }
}

#[test]
fn test_gap_closes_at_full_kpi() {
    let staff = roster("Ph.D-Admin", "Education", 3);
    let publications = vec![
        paper("A", 2567, JournalTier::Scopus, "Ph.D-Admin Lecturer 1"),
        paper("B", 2567, JournalTier::TciGroup1, "Ph.D-Admin Lecturer 2"),
    ];
    let rows = programs(&staff, &publications, &KpiSettings::default());
    let phd = find(&rows, "Ph.D-Admin");
    assert_eq!(phd.kpi, 5.0);

    let plan = gap::plan_for(phd);
    assert!(plan.is_achieved());
    assert_eq!(plan.gap(), 0.0);
}

#[test]
fn test_rounded_full_kpi_has_no_gap() {
    let total = 1.799;
    let row = KpiRow {
        kind: GroupKind::Program,
        group: "BBA".to_string(),
        faculty: Some("Business".to_string()),
        headcount: 9,
        target: 20,
        publications: 3,
        total_score: total,
        kpi: kpi::kpi_score(total, 9, 20, true),
    };
    assert_eq!(row.kpi, 5.0);

    let plan = gap::plan_for(&row);
    assert!(plan.is_achieved());
    assert_eq!(plan.gap(), 0.0);
    assert!(!gap::plan(total, 9, 20).is_achieved());

    let short = KpiRow {
        total_score: 1.7,
        kpi: kpi::kpi_score(1.7, 9, 20, true),
        ..row
    };
    assert!(!gap::plan_for(&short).is_achieved());
}

#[test]
fn test_faculty_goal_achieved() {
    let plan = gap::plan(10.0, 15, 20);
    assert!(plan.is_achieved());
    assert_eq!(plan.required_total(), 3.0);
}

#[test]
fn test_dashboard_counts_orphan_rows_in_summary_only() {
    let staff = roster("BBA", "Business", 9);
    let publications = vec![
        paper("Matched", 2567, JournalTier::Scopus, "BBA Lecturer 1"),
        paper("Matched", 2567, JournalTier::Scopus, "BBA Lecturer 2"),
        paper("Orphan", 2566, JournalTier::TciGroup2, "Former Lecturer"),
    ];

    let dashboard = Dashboard::build(
        &staff,
        &publications,
        YearFilter::All,
        &KpiSettings::default(),
    );
    assert_eq!(dashboard.summary.publications, 2);
    assert_eq!(dashboard.summary.total_score, 1.6);
    assert_eq!(dashboard.summary.staff, 9);
    assert_eq!(dashboard.years, vec![2566, 2567]);
    assert_eq!(dashboard.trend.len(), 2);
    assert_eq!(dashboard.unmatched_authors, vec!["Former Lecturer".to_string()]);
    assert_eq!(find(&dashboard.programs, "BBA").total_score, 1.0);

    let top = &dashboard.authors[0];
    assert_eq!(top.total_score, 1.0);
    assert_eq!(dashboard.authors.len(), 9);

    let (row, plan) = dashboard.gap(GroupKind::Program, " BBA ").expect("BBA gap");
    assert_eq!(row.group, "BBA");
    assert!(!plan.is_achieved());
    assert!(dashboard.gap(GroupKind::Program, "Nope").is_none());
}
