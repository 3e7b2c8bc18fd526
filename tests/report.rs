mod common;

use cellcheck::{
    Dataset, Value, build_report, compare,
    config::{Color, ReportConfig},
    pipeline::compare_datasets,
    report::{Element, SUMMARY_HEADERS},
};

use common::scenario;

#[test]
fn report_highlights_mismatch_and_lists_summary() {
    let control = scenario(2);
    let test = scenario(3);
    let (_, report) =
        compare_datasets(&control, &test, &ReportConfig::default()).expect("compare");

    let kinds = report
        .elements()
        .iter()
        .map(|element| match element {
            Element::Title(_) => "title",
            Element::Heading(_) => "heading",
            Element::Table(_) => "table",
        })
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["title", "table", "heading", "table"]);
    assert_eq!(
        report.elements()[0],
        Element::Title("Comparison Report".to_string())
    );
    assert_eq!(
        report.elements()[2],
        Element::Heading("Mismatched Values".to_string())
    );

    let primary = report.primary_table().expect("primary table");
    assert_eq!(primary.header(), ["A", "B"]);
    assert_eq!(primary.body(), [vec!["1", "x"], vec!["2", "y"]]);
    assert_eq!(primary.cell_style(2, 0).background, Some(Color::LIGHT_CORAL));
    for (row, column) in [(1, 0), (1, 1), (2, 1)] {
        assert_eq!(primary.cell_style(row, column).background, Some(Color::BEIGE));
    }
    assert_eq!(primary.cell_style(0, 0).background, Some(Color::GREY));

    let summary = report.summary_table().expect("summary table");
    assert_eq!(summary.header(), SUMMARY_HEADERS);
    assert_eq!(summary.body(), [vec!["1", "A", "2", "3"]]);
    assert!(
        summary
            .resolved_styles()
            .iter()
            .flatten()
            .all(|style| style.background != Some(Color::LIGHT_CORAL))
    );
}

#[test]
fn matching_tables_omit_summary_section() {
    let control = scenario(2);
    let (comparison, report) =
        compare_datasets(&control, &control, &ReportConfig::default()).expect("compare");
    assert!(comparison.is_match());
    assert_eq!(report.elements().len(), 2);
    assert!(report.summary_table().is_none());
    assert!(
        !report
            .elements()
            .iter()
            .any(|element| matches!(element, Element::Heading(_)))
    );
}

#[test]
fn empty_dataset_report_has_header_only_table() {
    let control = Dataset::from_rows(&["A", "B"], Vec::<Vec<Value>>::new()).unwrap();
    let comparison = compare(&control, &control).unwrap();
    let report = build_report(
        &control,
        &comparison.matrix,
        &comparison.records,
        &ReportConfig::default(),
    );
    assert_eq!(report.elements().len(), 2);
    let primary = report.primary_table().unwrap();
    assert_eq!(primary.header(), ["A", "B"]);
    assert!(primary.body().is_empty());
}

#[test]
fn primary_table_shows_control_values_only() {
    let control = Dataset::from_rows(&["v"], vec![vec![Value::Float(1.5)]]).unwrap();
    let test = Dataset::from_rows(&["v"], vec![vec![Value::Empty]]).unwrap();
    let (_, report) =
        compare_datasets(&control, &test, &ReportConfig::default()).expect("compare");

    assert_eq!(report.primary_table().unwrap().body(), [vec!["1.5"]]);
    assert_eq!(
        report.summary_table().unwrap().body(),
        [vec!["0", "v", "1.5", ""]]
    );
}

#[test]
fn highlight_overrides_follow_base_rules() {
    let control = scenario(2);
    let test = scenario(3);
    let (_, report) =
        compare_datasets(&control, &test, &ReportConfig::default()).expect("compare");
    let primary = report.primary_table().unwrap();

    let commands = primary.commands();
    let highlight = commands
        .iter()
        .position(|command| {
            command.rule == cellcheck::report::StyleRule::Background(Color::LIGHT_CORAL)
        })
        .expect("highlight command");
    let base = commands
        .iter()
        .position(|command| {
            command.rule == cellcheck::report::StyleRule::Background(Color::BEIGE)
        })
        .expect("base command");
    assert!(base < highlight);
}

#[test]
fn config_title_and_colors_flow_into_report() {
    let config = ReportConfig {
        title: "Nightly".to_string(),
        mismatch_background: Color::YELLOW,
        ..ReportConfig::default()
    };
    let (_, report) = compare_datasets(&scenario(2), &scenario(9), &config).expect("compare");
    assert_eq!(report.elements()[0], Element::Title("Nightly".to_string()));
    assert_eq!(
        report.primary_table().unwrap().cell_style(2, 0).background,
        Some(Color::YELLOW)
    );
}
