//! Reference reports shared by the integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tally::prelude::*;
use tally::NotSlottedCell;

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
}

pub fn one_column() -> TreeTable {
    TreeTable::new(vec![Column::new("value")])
}

/// Cash report: `IsForProfit` decides whether the restricted cash inputs apply
pub struct CashReport {
    pub agent: ReportAgent,
    pub is_for_profit: CellHandle,
    pub restricted_cash: CellHandle,
    pub partially_restricted_cash: CellHandle,
}

fn cash_availability() -> Op {
    let is_for_profit = || CellLocator::section("IsForProfit");
    Op::CheckAvailability(
        AvailabilityCheckChain::new()
            .step(Step::literal(
                Op::has_value(is_for_profit()),
                "got-disabled-1",
                AvailabilityCheckStepAction::NextStep,
                AvailabilityCheckStepAction::StopAsDisabled,
            ))
            .step(Step::literal(
                Op::get_value(is_for_profit(), ValueType::Boolean),
                "got-disabled-2",
                AvailabilityCheckStepAction::StopAsDisabled,
                AvailabilityCheckStepAction::NextStep,
            ))
            .ends_with(Availability::Enabled, Some("got-enabled")),
    )
}

pub fn cash_report() -> CashReport {
    let mut report = Report::new("cash").with_title("Cash");

    let is_for_profit =
        report.add_cell(InputCell::new(ValueType::Boolean).with_id("IsForProfit"));
    let restricted_cash = report.add_cell(
        InputCell::new(ValueType::Decimal)
            .with_id("RestrictedCash")
            .with_availability_check(cash_availability(), Availability::Enabled)
            .unwrap(),
    );
    let partially_restricted_cash = report.add_cell(
        InputCell::new(ValueType::Decimal)
            .with_id("PartiallyRestrictedCash")
            .with_availability_check(cash_availability(), Availability::Enabled)
            .unwrap(),
    );

    report.add_section(Section::new(
        "cash",
        one_column()
            .with_data_row(Row::with_cells(vec![is_for_profit]).with_id("for-profit"))
            .with_data_row(
                Row::new()
                    .with_id("restricted")
                    .with_child(Row::with_cells(vec![restricted_cash]))
                    .with_child(Row::with_cells(vec![partially_restricted_cash])),
            ),
    ));

    CashReport {
        agent: ReportAgent::new(report).unwrap(),
        is_for_profit,
        restricted_cash,
        partially_restricted_cash,
    }
}

/// Staffing report: two FTE inputs, a derived support FTE and a total
pub struct FteReport {
    pub agent: ReportAgent,
    pub sales_fte: CellHandle,
    pub warehouse_fte: CellHandle,
    pub warehouse_support_fte: CellHandle,
    pub total_fte: CellHandle,
}

fn input_required(id: &str) -> Op {
    Op::Validate(ValidationChain::new().step(Step::literal(
        Op::has_value(CellLocator::this()),
        &format!("input required for {id}"),
        ValidationStepAction::NextStep,
        ValidationStepAction::StopAsInvalid,
    )))
}

fn fte_input(id: &str) -> InputCell {
    InputCell::new(ValueType::Decimal)
        .with_id(id)
        .with_validation(input_required(id))
        .unwrap()
}

fn get_decimal(id: &str) -> Op {
    Op::get_value(CellLocator::section(id), ValueType::Decimal)
}

pub fn fte_report() -> FteReport {
    let mut report = Report::new("staffing");

    let sales_fte = report.add_cell(fte_input("SalesFte"));
    let warehouse_fte = report.add_cell(fte_input("WarehouseFte"));

    let warehouse_support_fte = report.add_cell(
        OperationCell::new(Op::if_then_else(
            Op::has_value(CellLocator::section("WarehouseFte")),
            Op::divide(get_decimal("WarehouseFte"), Op::constant(2i64)),
            Op::not_applicable_with(ValueType::Decimal, "no warehouse staff"),
        ))
        .unwrap()
        .with_id("WarehouseSupportFte")
        .with_validation(Op::Validate(ValidationChain::new()))
        .unwrap(),
    );

    let total_fte = report.add_cell(
        OperationCell::new(Op::if_then_else(
            Op::and_also(vec![
                Op::has_value(CellLocator::section("SalesFte")),
                Op::has_value(CellLocator::section("WarehouseFte")),
            ]),
            Op::sum(vec![
                get_decimal("SalesFte"),
                get_decimal("WarehouseFte"),
                get_decimal("WarehouseSupportFte"),
            ]),
            Op::abort_with(ValueType::Decimal, "fte inputs missing"),
        ))
        .unwrap()
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
        ))
        .unwrap(),
    );

    report.add_section(Section::new(
        "fte",
        one_column()
            .with_header_row(Row::new().with_id("header"))
            .with_data_row(Row::with_cells(vec![sales_fte]))
            .with_data_row(
                Row::with_cells(vec![warehouse_fte])
                    .with_child(Row::with_cells(vec![warehouse_support_fte])),
            )
            .with_footer_row(Row::with_cells(vec![total_fte])),
    ));

    FteReport {
        agent: ReportAgent::new(report).unwrap(),
        sales_fte,
        warehouse_fte,
        warehouse_support_fte,
        total_fte,
    }
}

/// Committed availability of a cell with an availability check
pub fn availability(agent: &ReportAgent, cell: CellHandle) -> (Availability, Option<String>) {
    let cell = agent.cache().not_slotted(cell).unwrap();
    (
        cell.availability(),
        cell.availability_message().map(str::to_string),
    )
}

/// Committed validation status and message
pub fn validation(agent: &ReportAgent, cell: CellHandle) -> (ValidationStatus, Option<String>) {
    let cell = agent.cache().not_slotted(cell).unwrap();
    (
        cell.validation_status(),
        cell.validation_message().map(str::to_string),
    )
}

/// Committed operation status
pub fn op_status(agent: &ReportAgent, cell: CellHandle) -> OpExecutionStatus {
    agent
        .cache()
        .not_slotted(cell)
        .and_then(NotSlottedCell::as_operation)
        .unwrap()
        .op_execution_status()
}
