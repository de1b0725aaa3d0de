use colored::*;
use listcraft_core::reader::{COLUMN_A, COLUMN_B, cell_ref};
use listcraft_core::writer::{CellEdit, Substitution};
use listcraft_core::{CellContent, RewriteMode, RewritePlan, Worksheet};
use std::path::Path;

/// Print the edits of a dry run
pub fn print_plan(file: &Path, mode: &RewriteMode, plan: &RewritePlan) {
    println!(
        "{} {} ({})",
        "[DRY RUN]".yellow().bold(),
        file.display(),
        mode.name()
    );

    if plan.is_empty() {
        println!("{}", "No changes: the template would be returned as is".green());
        return;
    }

    for (row, edits) in plan.rows() {
        for (column, edit) in &edits.cells {
            println!("  {} {}", cell_ref(row, *column).yellow(), describe_edit(edit));
        }
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Formulas:".bold(), plan.formula_edits());
    println!("  {} {}", "Brand cells:".bold(), plan.text_edits());
}

pub fn print_written(output: &Path) {
    println!("{}", "✓ Successfully rewrote template".green().bold());
    println!("Output: {}", output.display());
}

/// List the A/B formula cells of every data row
pub fn print_sheet(file: &Path, sheet: &Worksheet, sentinel: &str) {
    println!("{}", format!("Inspecting: {}", file.display()).bold());
    println!("{} {}", "Sheet:".bold(), sheet.path.cyan().bold());

    let matcher = Substitution::new(sentinel, "");
    let mut data_rows = 0;
    let mut with_sentinel = 0;

    for row in sheet.data_rows() {
        data_rows += 1;
        for column in [COLUMN_A, COLUMN_B] {
            let Some(cell) = row.cell(column) else {
                continue;
            };
            let reference = cell.reference(row.number);
            match &cell.content {
                CellContent::Formula(formula) if has_sentinel(&matcher, formula) => {
                    with_sentinel += 1;
                    println!("  {} {}", reference.yellow(), formula.green());
                }
                CellContent::Formula(formula) => println!("  {} {}", reference.yellow(), formula),
                CellContent::SharedFormula { index } => println!(
                    "  {} {}",
                    reference.yellow(),
                    format!("(shared formula #{})", index).dimmed()
                ),
                CellContent::Value(_) | CellContent::Blank => {}
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Data rows:".bold(), data_rows);
    if with_sentinel == 0 {
        println!("  {} {}", "Sentinel formulas:".red().bold(), 0);
    } else {
        println!("  {} {}", "Sentinel formulas:".bold(), with_sentinel);
    }
}

/// Same match the rewriter uses, so `inspect` and `rewrite` agree
fn has_sentinel(matcher: &Substitution, formula: &str) -> bool {
    matcher.apply(formula).is_some()
}

fn describe_edit(edit: &CellEdit) -> String {
    match edit {
        CellEdit::ReplaceFormula(formula) => format!("formula -> {}", formula),
        CellEdit::WriteText {
            value,
            insert: true,
        } => format!("new cell -> {}", value),
        CellEdit::WriteText { value, .. } => format!("text -> {}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_match_follows_formula_quoting() {
        let plain = Substitution::new("ZDX", "");
        assert!(has_sentinel(&plain, "\"ZDX\"&K2"));
        assert!(!has_sentinel(&plain, "ZDX&K2"));

        // An embedded quote appears doubled inside a formula string literal
        let quoted = Substitution::new("Z\"X", "");
        assert!(has_sentinel(&quoted, "\"Z\"\"X\"&K2"));
        assert!(!has_sentinel(&quoted, "\"Z\"X\"&K2"));
    }

    #[test]
    fn test_describe_edit() {
        assert_eq!(
            describe_edit(&CellEdit::ReplaceFormula("\"ABC\"&K2".to_string())),
            "formula -> \"ABC\"&K2"
        );
        assert_eq!(
            describe_edit(&CellEdit::WriteText {
                value: "Acme".to_string(),
                insert: true
            }),
            "new cell -> Acme"
        );
        assert_eq!(
            describe_edit(&CellEdit::WriteText {
                value: "Acme".to_string(),
                insert: false
            }),
            "text -> Acme"
        );
    }
}
