use comfy_table::{modifiers, presets, Attribute, Cell, CellAlignment, Color, Table};

use crate::analysis::{ComparisonReport, Divergence, Kpis, ProfitBreakdown};
use crate::domain::FormulationKind;

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{:.2}", value)).set_alignment(CellAlignment::Right)
}

pub fn build_comparison_table(report: &ComparisonReport) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Metric".to_string(),
        format!("{} total", report.reference),
        format!("{} total", report.candidate),
        "Difference".to_string(),
        "Diff %".to_string(),
        "Match".to_string(),
    ]);
    for m in &report.metrics {
        table.add_row(vec![
            Cell::new(m.metric),
            number(m.reference_total),
            number(m.candidate_total),
            number(m.difference),
            number(m.difference_pct),
            Cell::new(if m.matches { "yes" } else { "no" })
                .fg(if m.matches { Color::Green } else { Color::Red }),
        ]);
    }
    table
}

pub fn describe_divergence(divergence: Divergence) -> String {
    match divergence {
        Divergence::Agreement => "Formulations agree within tolerance.".to_string(),
        Divergence::ExplainedByChpBoilerOrdering { steps } => format!(
            "Formulations diverge: the direct optimum runs the CHP below the boiler in {} hour(s), \
             which the network model forbids.",
            steps
        ),
        Divergence::Unexplained => "Formulations diverge without a known cause.".to_string(),
    }
}

/// KPIs and profit side by side, one column per formulation
pub fn build_kpi_table(rows: &[(FormulationKind, Kpis, ProfitBreakdown)]) -> Table {
    let mut table = new_table();
    let mut header = vec!["KPI".to_string()];
    header.extend(rows.iter().map(|(kind, _, _)| kind.to_string()));
    table.set_header(header);

    let Some((_, first, _)) = rows.first() else {
        return table;
    };
    for (i, (label, _)) in first.rows().iter().enumerate() {
        let mut row = vec![Cell::new(label)];
        row.extend(rows.iter().map(|(_, kpis, _)| number(kpis.rows()[i].1)));
        table.add_row(row);
    }

    let profit_rows: [(&str, fn(&ProfitBreakdown) -> f64); 5] = [
        ("Electricity revenue (EUR)", |p| p.electricity_revenue),
        ("Gas cost (EUR)", |p| p.gas_cost),
        ("CO2 cost (EUR)", |p| p.co2_cost),
        ("Marginal cost (EUR)", |p| p.marginal_cost),
        ("Profit (EUR)", |p| p.profit),
    ];
    for (label, value) in profit_rows {
        let mut row = vec![Cell::new(label).add_attribute(Attribute::Dim)];
        row.extend(rows.iter().map(|(_, _, profit)| {
            let v = value(profit);
            number(v).fg(if v < 0.0 { Color::Red } else { Color::Reset })
        }));
        table.add_row(row);
    }
    table
}
