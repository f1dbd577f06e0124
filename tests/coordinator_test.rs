use collabstat::{
    CategoryInput, Cell, Coordinator, OutputFormat, OutputWorkbook, RolePairWeightTable, Table,
};
use std::sync::Arc;
use std::time::Duration;

fn weights() -> Arc<RolePairWeightTable> {
    Arc::new(RolePairWeightTable::build(vec![
        ("role_a", "role_b", "weight"),
        ("lead", "support", "2"),
        ("support", "support", "1"),
    ]))
}

/// `items` identical work items, entities listed in the given order
fn category(name: &str, items: usize, entities: [&str; 3]) -> Table {
    let mut rows = Vec::new();
    for _ in 0..items {
        rows.push(vec!["title".to_string()]);
        rows.push(vec!["date".to_string()]);
        rows.push(vec!["lead".to_string(), "support".to_string(), "support".to_string()]);
        rows.push(entities.iter().map(|e| e.to_string()).collect());
    }
    Table::new(name, rows)
}

#[test]
fn test_many_categories_merge_without_lost_updates() {
    let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Csv));
    let coordinator =
        Coordinator::new(weights(), Arc::clone(&workbook)).with_wait_timeout(Duration::from_secs(60));

    // Alternate orientations so concurrent merges hit both key forms
    let inputs: Vec<_> = (0..16)
        .map(|i| {
            let entities = if i % 2 == 0 {
                ["A", "B", "C"]
            } else {
                ["B", "A", "C"]
            };
            CategoryInput::Located(category(&format!("cat-{:02}", i), 50, entities))
        })
        .collect();

    let report = coordinator.run(inputs).unwrap();

    assert_eq!(report.completed(), 16);
    assert_eq!(report.global_pairs, 3);
    assert_eq!(workbook.sheet_count(), 17);

    // Per item: lead/support = 2 for the lead's two pairs, support/support = 1 for the third
    let all = workbook.sheet_rows("All").unwrap();
    let names: Vec<_> = all[0].iter().skip(1).cloned().collect();
    let idx = |name: &str| names.iter().position(|c| *c == Cell::text(name)).unwrap() + 1;

    let total = |a: &str, b: &str| all[idx(a)][idx(b)].clone();
    // A leads in 8 categories, B leads in the other 8
    assert_eq!(total("A", "B"), Cell::Number(16 * 50 * 2));
    assert_eq!(total("A", "C"), Cell::Number(8 * 50 * 2 + 8 * 50));
    assert_eq!(total("C", "B"), Cell::Number(8 * 50 * 2 + 8 * 50));
    assert_eq!(total("C", "C"), Cell::Number(0));
}

#[test]
fn test_category_sheets_match_their_own_maps() {
    let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Xlsx));
    let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
    let inputs = vec![
        CategoryInput::Located(category("first", 1, ["A", "B", "C"])),
        CategoryInput::Located(category("second", 2, ["D", "E", "F"])),
    ];

    coordinator.run(inputs).unwrap();

    let second = workbook.sheet_rows("second").unwrap();
    assert_eq!(
        second[0],
        vec![Cell::Blank, Cell::text("D"), Cell::text("E"), Cell::text("F")]
    );
    assert_eq!(second[1][2], Cell::Number(4));
    assert_eq!(second[2][3], Cell::Number(2));

    let all = workbook.sheet_rows("All").unwrap();
    assert_eq!(all.len(), 7);
}

#[test]
fn test_long_category_names_in_csv_output() {
    let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Csv));
    let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
    let inputs = vec![
        CategoryInput::Located(category("Feature films co-produced abroad 2018", 1, ["A", "B", "C"])),
        CategoryInput::Located(category("2018", 1, ["A", "D", "E"])),
    ];

    let report = coordinator.run(inputs).unwrap();

    assert_eq!(report.completed(), 2);
    assert_eq!(workbook.sheet_count(), 3);
    assert!(workbook.sheet_rows("Feature films co-produced abroad 2018").is_some());
    assert!(workbook.sheet_rows("all").is_some());
}
