//! Payroll generation and reconciliation
//!
//! A generation run turns every unpaid attendance row into exactly one payroll per
//! employee and links the rows back to it. Insert and link-back share one transaction,
//! and runs are serialized both in-process and by row locks on the unpaid set.

use std::collections::HashMap;

use chrono::Local;
use futures_util::lock::Mutex;
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, ActiveValue::{Set, Unchanged}, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entity::{attendance, employee, payroll, prelude::*},
    error::ServiceError,
    ledger::{self, AttendanceTotals},
};

pub use calculator::{net_pay, PayBasis};

mod calculator;

/// What one employee's share of a generation run will be stored as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollDraft {
    pub employee_id: Uuid,
    pub totals: AttendanceTotals,
    pub attendance_ids: Vec<Uuid>,
}

/// One draft per employee having unpaid rows, employees without rows get nothing
pub fn plan(unpaid: Vec<attendance::Model>) -> Vec<PayrollDraft> {
    ledger::partition_by_employee(unpaid)
        .into_iter()
        .map(|(employee_id, rows)| PayrollDraft {
            employee_id,
            totals: AttendanceTotals::from_rows(&rows),
            attendance_ids: rows.iter().map(|row| row.id).collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub total_working_days: i32,
    pub total_absent_days: i32,
    pub total_hours: Decimal,
}

impl PayrollTotals {
    fn validate(self) -> Result<Self, ServiceError> {
        if self.total_working_days < 0 || self.total_absent_days < 0 || self.total_hours < Decimal::ZERO {
            return Err(ServiceError::Validation("payroll totals must not be negative".to_string()));
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollView {
    #[serde(flatten)]
    pub payroll: payroll::Model,
    pub net_pay: Decimal,
}

impl PayrollView {
    pub fn new(payroll: payroll::Model, employee: &employee::Model) -> Result<Self, ServiceError> {
        let net_pay = net_pay(employee.salary_type, employee.salary_rate, PayBasis::from(&payroll))?;

        Ok(Self { payroll, net_pay })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSummary {
    #[serde(flatten)]
    pub employee: employee::Model,
    pub total_payrolls: usize,
    pub latest_payroll_hours: Decimal,
    pub total_earnings: Decimal,
    pub avg_hours: Decimal,
}

impl PayrollSummary {
    /// `payrolls` are expected newest first
    pub fn new(employee: employee::Model, payrolls: &[payroll::Model]) -> Result<Self, ServiceError> {
        let total_earnings = payrolls.iter()
            .map(|payroll| net_pay(employee.salary_type, employee.salary_rate, PayBasis::from(payroll)))
            .sum::<Result<Decimal, _>>()?;

        let total_hours: Decimal = payrolls.iter().map(|payroll| payroll.total_hours).sum();
        let avg_hours = match payrolls.len() {
            0 => Decimal::ZERO,
            n => (total_hours / Decimal::from(n)).round_dp(2),
        };

        Ok(Self {
            latest_payroll_hours: payrolls.first().map(|payroll| payroll.total_hours).unwrap_or_default(),
            total_payrolls: payrolls.len(),
            total_earnings,
            avg_hours,
            employee,
        })
    }
}

/// Single writer for payroll generation
#[derive(Default)]
pub struct PayrollGenerator {
    lock: Mutex<()>,
}

impl PayrollGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one payroll generation batch over all unpaid attendance
    ///
    /// Returns `ServiceError::EmptyBatch` when there is nothing to process.
    #[instrument(skip_all)]
    pub async fn generate(&self, db: &impl TransactionTrait) -> Result<Vec<payroll::Model>, ServiceError> {
        let _guard = self.lock.lock().await;

        let txn = db.begin().await
            .map_err(|err| ServiceError::store("begin payroll generation", err))?;

        let drafts = plan(ledger::unpaid(&txn).await?);

        if drafts.is_empty() {
            info!("no unpaid attendance to process");
            rollback(txn).await;
            return Err(ServiceError::EmptyBatch);
        }

        let generated_on = Local::now().fixed_offset();
        let mut payrolls = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let payroll = Payroll::insert(payroll::ActiveModel {
                id: Set(Uuid::new_v4()),
                employee_id: Set(draft.employee_id),
                total_working_days: Set(draft.totals.present),
                total_absent_days: Set(draft.totals.absent),
                total_hours: Set(draft.totals.hours),
                generated_on: Set(generated_on),
            }).exec_with_returning(&txn).await
                .map_err(|err| ServiceError::store("insert payroll", err))?;

            let expected = draft.attendance_ids.len();
            let linked = Attendance::update_many()
                .col_expr(attendance::Column::PayrollId, Expr::value(payroll.id))
                .filter(attendance::Column::Id.is_in(draft.attendance_ids))
                .filter(attendance::Column::PayrollId.is_null())
                .exec(&txn).await
                .map_err(|err| ServiceError::store("link attendance to payroll", err))?
                .rows_affected;

            if linked != expected as u64 {
                error!(payroll_id = %payroll.id, expected, linked, "attendance link-back incomplete, rolling back");
                rollback(txn).await;
                return Err(ServiceError::PartialLinkFailure { payroll_id: payroll.id, expected, linked });
            }

            payrolls.push(payroll);
        }

        txn.commit().await
            .map_err(|err| ServiceError::store("commit payroll generation", err))?;

        info!(count = payrolls.len(), "payroll generated");

        Ok(payrolls)
    }
}

async fn rollback(txn: sea_orm::DatabaseTransaction) {
    if let Err(err) = txn.rollback().await {
        error!(error = %err, "unable to roll back payroll generation");
    }
}

/// Deletes a payroll after unlinking its attendance so the rows are reprocessable
///
/// Returns how many attendance rows were unlinked.
#[instrument(skip(db))]
pub async fn delete(db: &impl TransactionTrait, payroll_id: Uuid) -> Result<u64, ServiceError> {
    let txn = db.begin().await
        .map_err(|err| ServiceError::store("begin payroll deletion", err))?;

    if Payroll::find_by_id(payroll_id).one(&txn).await
        .map_err(|err| ServiceError::store("load payroll", err))?
        .is_none()
    {
        rollback(txn).await;
        return Err(ServiceError::NotFound);
    }

    let unlinked = Attendance::update_many()
        .col_expr(attendance::Column::PayrollId, Expr::value(Option::<Uuid>::None))
        .filter(attendance::Column::PayrollId.eq(payroll_id))
        .exec(&txn).await
        .map_err(|err| ServiceError::store("unlink payroll attendance", err))?
        .rows_affected;

    Payroll::delete_by_id(payroll_id)
        .exec(&txn).await
        .map_err(|err| ServiceError::store("delete payroll", err))?;

    txn.commit().await
        .map_err(|err| ServiceError::store("commit payroll deletion", err))?;

    info!(unlinked, "payroll deleted");

    Ok(unlinked)
}

/// HR correction of stored totals, last write wins
#[instrument(skip(db))]
pub async fn update(db: &impl ConnectionTrait, payroll_id: Uuid, totals: PayrollTotals) -> Result<payroll::Model, ServiceError> {
    let totals = totals.validate()?;

    let res = Payroll::update(payroll::ActiveModel {
        id: Unchanged(payroll_id),
        total_working_days: Set(totals.total_working_days),
        total_absent_days: Set(totals.total_absent_days),
        total_hours: Set(totals.total_hours),
        ..Default::default()
    }).exec(db).await;

    match res {
        Ok(model) => Ok(model),
        Err(DbErr::RecordNotUpdated) => Err(ServiceError::NotFound),
        Err(err) => Err(ServiceError::store("update payroll", err)),
    }
}

/// Newest first with net pay
pub async fn for_employee(db: &impl ConnectionTrait, employee: &employee::Model) -> Result<Vec<PayrollView>, ServiceError> {
    let payrolls = Payroll::find()
        .filter(payroll::Column::EmployeeId.eq(employee.id))
        .order_by_desc(payroll::Column::GeneratedOn)
        .all(db).await
        .map_err(|err| ServiceError::store("load employee payroll", err))?;

    payrolls.into_iter()
        .map(|payroll| PayrollView::new(payroll, employee))
        .collect()
}

pub async fn summaries(db: &impl ConnectionTrait) -> Result<Vec<PayrollSummary>, ServiceError> {
    let employees = Employee::find()
        .order_by_asc(employee::Column::Name)
        .all(db).await
        .map_err(|err| ServiceError::store("load employees", err))?;

    let payrolls = Payroll::find()
        .order_by_desc(payroll::Column::GeneratedOn)
        .all(db).await
        .map_err(|err| ServiceError::store("load payroll", err))?;

    let mut by_employee: HashMap<Uuid, Vec<payroll::Model>> = HashMap::new();
    for payroll in payrolls {
        by_employee.entry(payroll.employee_id).or_default().push(payroll);
    }

    employees.into_iter()
        .map(|employee| {
            let payrolls = by_employee.remove(&employee.id).unwrap_or_default();
            PayrollSummary::new(employee, &payrolls)
        })
        .collect()
}
