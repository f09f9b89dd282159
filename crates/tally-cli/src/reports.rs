//! Built-in reference reports

use anyhow::Result;
use tally::prelude::*;

fn one_column() -> TreeTable {
    TreeTable::new(vec![Column::new("value").with_header("Value")])
}

fn has_value(id: &str) -> Op {
    Op::has_value(CellLocator::section(id))
}

fn decimal(id: &str) -> Op {
    Op::get_value(CellLocator::section(id), ValueType::Decimal)
}

/// Cash report and its `IsForProfit` input
pub fn cash() -> Result<(ReportAgent, CellHandle)> {
    let check = || {
        Op::CheckAvailability(
            AvailabilityCheckChain::new()
                .step(Step::literal(
                    has_value("IsForProfit"),
                    "got-disabled-1",
                    AvailabilityCheckStepAction::NextStep,
                    AvailabilityCheckStepAction::StopAsDisabled,
                ))
                .step(Step::literal(
                    Op::get_value(CellLocator::section("IsForProfit"), ValueType::Boolean),
                    "got-disabled-2",
                    AvailabilityCheckStepAction::StopAsDisabled,
                    AvailabilityCheckStepAction::NextStep,
                ))
                .ends_with(Availability::Enabled, Some("got-enabled")),
        )
    };

    let mut report = Report::new("cash").with_title("Cash");
    let is_for_profit =
        report.add_cell(InputCell::new(ValueType::Boolean).with_id("IsForProfit"));
    let restricted = report.add_cell(
        InputCell::new(ValueType::Decimal)
            .with_id("RestrictedCash")
            .with_availability_check(check(), Availability::Enabled)?,
    );
    let partially_restricted = report.add_cell(
        InputCell::new(ValueType::Decimal)
            .with_id("PartiallyRestrictedCash")
            .with_availability_check(check(), Availability::Enabled)?,
    );
    report.add_section(
        Section::new(
            "cash",
            one_column()
                .with_data_row(Row::with_cells(vec![is_for_profit]))
                .with_data_row(
                    Row::new()
                        .with_child(Row::with_cells(vec![restricted]))
                        .with_child(Row::with_cells(vec![partially_restricted])),
                ),
        )
        .with_title("Restricted cash"),
    );

    Ok((ReportAgent::new(report)?, is_for_profit))
}

/// Staffing report and its `SalesFte` and `WarehouseFte` inputs
pub fn fte() -> Result<(ReportAgent, CellHandle, CellHandle)> {
    let input = |id: &str| -> Result<InputCell> {
        let validation = Op::Validate(ValidationChain::new().step(Step::literal(
            Op::has_value(CellLocator::this()),
            &format!("input required for {id}"),
            ValidationStepAction::NextStep,
            ValidationStepAction::StopAsInvalid,
        )));
        Ok(InputCell::new(ValueType::Decimal)
            .with_id(id)
            .with_validation(validation)?)
    };

    let mut report = Report::new("staffing").with_title("Staffing");
    let sales = report.add_cell(input("SalesFte")?);
    let warehouse = report.add_cell(input("WarehouseFte")?);
    let support = report.add_cell(
        OperationCell::new(Op::if_then_else(
            has_value("WarehouseFte"),
            Op::divide(decimal("WarehouseFte"), Op::constant(2i64)),
            Op::not_applicable_with(ValueType::Decimal, "no warehouse staff"),
        ))?
        .with_id("WarehouseSupportFte")
        .with_validation(Op::Validate(ValidationChain::new()))?,
    );
    let total = report.add_cell(
        OperationCell::new(Op::if_then_else(
            Op::and_also(vec![has_value("SalesFte"), has_value("WarehouseFte")]),
            Op::sum(vec![
                decimal("SalesFte"),
                decimal("WarehouseFte"),
                decimal("WarehouseSupportFte"),
            ]),
            Op::abort_with(ValueType::Decimal, "fte inputs missing"),
        ))?
        .with_id("TotalFte")
        .with_validation(Op::Validate(
            ValidationChain::new()
                .step(Step::literal(
                    Op::is_equal_to(
                        Op::GetOpExecutionStatus(CellLocator::this()),
                        Op::constant(OpExecutionStatus::Completed),
                    ),
                    "total not computed",
                    ValidationStepAction::NextStep,
                    ValidationStepAction::StopToAbort,
                ))
                .step(Step::literal(
                    Op::compare(
                        Op::get_value(CellLocator::this(), ValueType::Decimal),
                        CompareOperator::GreaterThanOrEqualTo,
                        Op::constant(0i64),
                    ),
                    "total must be >= 0",
                    ValidationStepAction::NextStep,
                    ValidationStepAction::StopAsInvalid,
                )),
        ))?,
    );
    report.add_section(
        Section::new(
            "fte",
            one_column()
                .with_data_row(Row::with_cells(vec![sales]))
                .with_data_row(
                    Row::with_cells(vec![warehouse])
                        .with_child(Row::with_cells(vec![support])),
                )
                .with_footer_row(Row::with_cells(vec![total])),
        )
        .with_title("Full-time equivalents"),
    );

    Ok((ReportAgent::new(report)?, sales, warehouse))
}
