//! Attendance ledger
//!
//! Every read and write of attendance goes through here. Rows linked to a payroll are
//! frozen: mutations are issued with `payroll_id IS NULL` in their predicate so a row
//! that got paid between the caller's read and its write is still refused.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    consts::MAX_HOURS_PER_DAY,
    entity::{attendance, prelude::*, sea_orm_active_enums::AttendanceStatus},
    error::ServiceError,
    utils,
};

/// Attendance as submitted by HR, before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub hours_worked: Decimal,
}

impl NewAttendance {
    /// Absent days never carry hours
    pub fn validate(mut self) -> Result<Self, ServiceError> {
        if self.status == AttendanceStatus::Absent {
            self.hours_worked = Decimal::ZERO;
        }

        if self.hours_worked < Decimal::ZERO || self.hours_worked > Decimal::from(MAX_HOURS_PER_DAY) {
            return Err(ServiceError::Validation(format!("hours worked must be between 0 and {MAX_HOURS_PER_DAY}")));
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceTotals {
    pub present: i32,
    pub absent: i32,
    pub hours: Decimal,
}

impl AttendanceTotals {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a attendance::Model>) -> Self {
        rows.into_iter().fold(Self::default(), |mut totals, row| {
            match row.status {
                AttendanceStatus::Present => totals.present += 1,
                AttendanceStatus::Absent => totals.absent += 1,
            }
            totals.hours += row.hours_worked;

            totals
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: attendance::Model,
    pub is_paid: bool,
}

impl From<attendance::Model> for AttendanceEntry {
    fn from(record: attendance::Model) -> Self {
        Self {
            is_paid: record.payroll_id.is_some(),
            record,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total_attendance: i32,
    pub present_count: i32,
    pub absent_count: i32,
    pub total_hours: Decimal,
    pub unpaid_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub totals: AttendanceTotals,
    pub records: Vec<attendance::Model>,
}

pub fn ensure_unpaid(record: &attendance::Model) -> Result<(), ServiceError> {
    match record.payroll_id {
        Some(_) => Err(ServiceError::PaidRecordImmutable),
        None => Ok(()),
    }
}

pub fn partition_by_employee(rows: Vec<attendance::Model>) -> BTreeMap<Uuid, Vec<attendance::Model>> {
    let mut partitions: BTreeMap<Uuid, Vec<attendance::Model>> = BTreeMap::new();

    for row in rows {
        partitions.entry(row.employee_id).or_default().push(row);
    }

    partitions
}

pub async fn unpaid_for(db: &impl ConnectionTrait, employee_id: Uuid) -> Result<Vec<attendance::Model>, ServiceError> {
    Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::PayrollId.is_null())
        .order_by_asc(attendance::Column::Date)
        .all(db).await
        .map_err(|err| ServiceError::store("load unpaid attendance", err))
}

/// All unpaid attendance system-wide, row-locked until the surrounding transaction ends
pub async fn unpaid(db: &impl ConnectionTrait) -> Result<Vec<attendance::Model>, ServiceError> {
    Attendance::find()
        .filter(attendance::Column::PayrollId.is_null())
        .order_by_asc(attendance::Column::EmployeeId)
        .order_by_asc(attendance::Column::Date)
        .lock_exclusive()
        .all(db).await
        .map_err(|err| ServiceError::store("load unpaid attendance", err))
}

/// Existing record occupying `(employee_id, date)`
///
/// A record being edited in place is not a duplicate of itself.
pub async fn check_duplicate(
    db: &impl ConnectionTrait,
    employee_id: Uuid,
    date: NaiveDate,
    editing: Option<&attendance::Model>,
) -> Result<Option<attendance::Model>, ServiceError> {
    if let Some(editing) = editing {
        if editing.employee_id == employee_id && editing.date == date {
            return Ok(None);
        }
    }

    let mut query = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.eq(date));

    if let Some(editing) = editing {
        query = query.filter(attendance::Column::Id.ne(editing.id));
    }

    query
        .one(db).await
        .map_err(|err| ServiceError::store("check duplicate attendance", err))
}

#[instrument(skip(db))]
pub async fn insert(db: &impl ConnectionTrait, new: NewAttendance) -> Result<attendance::Model, ServiceError> {
    let new = new.validate()?;

    if check_duplicate(db, new.employee_id, new.date, None).await?.is_some() {
        return Err(ServiceError::DuplicateRecord);
    }

    let model = attendance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        employee_id: Set(new.employee_id),
        date: Set(new.date),
        status: Set(new.status),
        hours_worked: Set(new.hours_worked),
        payroll_id: Set(None),
    };

    Attendance::insert(model)
        .exec_with_returning(db).await
        .map_err(|err| ServiceError::store("insert attendance", err))
}

#[instrument(skip(db, existing), fields(attendance_id = %existing.id))]
pub async fn update(db: &impl ConnectionTrait, existing: &attendance::Model, new: NewAttendance) -> Result<attendance::Model, ServiceError> {
    ensure_unpaid(existing)?;
    let new = new.validate()?;

    if check_duplicate(db, new.employee_id, new.date, Some(existing)).await?.is_some() {
        return Err(ServiceError::DuplicateRecord);
    }

    let res = Attendance::update(attendance::ActiveModel {
        id: Unchanged(existing.id),
        employee_id: Set(new.employee_id),
        date: Set(new.date),
        status: Set(new.status),
        hours_worked: Set(new.hours_worked),
        ..Default::default()
    })
        .filter(attendance::Column::PayrollId.is_null())
        .exec(db).await;

    match res {
        Ok(model) => Ok(model),
        Err(DbErr::RecordNotUpdated) => Err(explain_untouched(db, existing.id).await),
        Err(err) => Err(ServiceError::store("update attendance", err)),
    }
}

#[instrument(skip(db))]
pub async fn delete(db: &impl ConnectionTrait, attendance_id: Uuid) -> Result<(), ServiceError> {
    let res = Attendance::delete_many()
        .filter(attendance::Column::Id.eq(attendance_id))
        .filter(attendance::Column::PayrollId.is_null())
        .exec(db).await
        .map_err(|err| ServiceError::store("delete attendance", err))?;

    if res.rows_affected == 0 {
        return Err(explain_untouched(db, attendance_id).await);
    }

    debug!("attendance deleted");

    Ok(())
}

/// Why a conditional mutation matched nothing: the row is gone or it has been paid
async fn explain_untouched(db: &impl ConnectionTrait, attendance_id: Uuid) -> ServiceError {
    match Attendance::find_by_id(attendance_id).one(db).await {
        Ok(Some(record)) => {
            warn!(%attendance_id, payroll_id = ?record.payroll_id, "refused to modify paid attendance");
            ServiceError::PaidRecordImmutable
        },
        Ok(None) => ServiceError::NotFound,
        Err(err) => ServiceError::store("load attendance", err),
    }
}

/// Newest first, flagged with their paid state
pub async fn history(db: &impl ConnectionTrait, employee_id: Uuid) -> Result<Vec<AttendanceEntry>, ServiceError> {
    let records = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .order_by_desc(attendance::Column::Date)
        .all(db).await
        .map_err(|err| ServiceError::store("load attendance history", err))?;

    Ok(records.into_iter().map(AttendanceEntry::from).collect())
}

pub async fn stats_since(db: &impl ConnectionTrait, since: NaiveDate) -> Result<BTreeMap<Uuid, AttendanceStats>, ServiceError> {
    let records = Attendance::find()
        .filter(attendance::Column::Date.gte(since))
        .all(db).await
        .map_err(|err| ServiceError::store("load attendance stats", err))?;

    let stats = partition_by_employee(records)
        .into_iter()
        .map(|(employee_id, rows)| {
            let totals = AttendanceTotals::from_rows(&rows);

            (employee_id, AttendanceStats {
                total_attendance: rows.len() as i32,
                present_count: totals.present,
                absent_count: totals.absent,
                total_hours: totals.hours,
                unpaid_count: rows.iter().filter(|row| row.payroll_id.is_none()).count() as i32,
            })
        })
        .collect();

    Ok(stats)
}

/// Totals backing the monthly daily time record
pub async fn monthly_totals(db: &impl ConnectionTrait, employee_id: Uuid, year: i32, month: u32) -> Result<MonthlyRecord, ServiceError> {
    let Some((start, end)) = utils::month_range(year, month) else {
        return Err(ServiceError::Validation(format!("{year}-{month} is not a valid month")));
    };

    let records = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.between(start, end))
        .order_by_asc(attendance::Column::Date)
        .all(db).await
        .map_err(|err| ServiceError::store("load monthly attendance", err))?;

    Ok(MonthlyRecord {
        start,
        end,
        totals: AttendanceTotals::from_rows(&records),
        records,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Days, Local};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    use super::*;

    pub(crate) fn record(employee_id: Uuid, day: u64, status: AttendanceStatus, hours: Decimal) -> attendance::Model {
        attendance::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().fixed_offset(),
            employee_id,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().checked_add_days(Days::new(day)).unwrap(),
            status,
            hours_worked: hours,
            payroll_id: None,
        }
    }

    fn submission(employee_id: Uuid, status: AttendanceStatus, hours: Decimal) -> NewAttendance {
        NewAttendance {
            employee_id,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            status,
            hours_worked: hours,
        }
    }

    #[test]
    fn test_validate() {
        let employee_id = Uuid::new_v4();

        let absent = submission(employee_id, AttendanceStatus::Absent, dec!(8)).validate().unwrap();
        assert_eq!(absent.hours_worked, Decimal::ZERO);

        assert!(submission(employee_id, AttendanceStatus::Present, dec!(24)).validate().is_ok());
        assert!(matches!(
            submission(employee_id, AttendanceStatus::Present, dec!(24.5)).validate(),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            submission(employee_id, AttendanceStatus::Present, dec!(-1)).validate(),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_totals_and_partition() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let rows = vec![
            record(alice, 0, AttendanceStatus::Present, dec!(8)),
            record(bob, 0, AttendanceStatus::Present, dec!(7.5)),
            record(alice, 1, AttendanceStatus::Absent, dec!(0)),
            record(alice, 2, AttendanceStatus::Present, dec!(6.25)),
        ];

        let partitions = partition_by_employee(rows);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[&alice].len(), 3);
        assert_eq!(partitions[&bob].len(), 1);

        let totals = AttendanceTotals::from_rows(&partitions[&alice]);
        assert_eq!(totals, AttendanceTotals { present: 2, absent: 1, hours: dec!(14.25) });
    }

    #[test]
    fn test_ensure_unpaid() {
        let mut row = record(Uuid::new_v4(), 0, AttendanceStatus::Present, dec!(8));
        assert!(ensure_unpaid(&row).is_ok());

        row.payroll_id = Some(Uuid::new_v4());
        assert!(matches!(ensure_unpaid(&row), Err(ServiceError::PaidRecordImmutable)));
    }

    #[actix_web::test]
    async fn test_check_duplicate_skips_record_being_edited() {
        let employee_id = Uuid::new_v4();
        let existing = record(employee_id, 0, AttendanceStatus::Present, dec!(8));

        // Nothing appended: a query here would fail the test
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let duplicate = check_duplicate(&db, employee_id, existing.date, Some(&existing)).await.unwrap();
        assert!(duplicate.is_none());
        assert!(db.into_transaction_log().is_empty());
    }

    #[actix_web::test]
    async fn test_insert_rejects_duplicate() {
        let employee_id = Uuid::new_v4();
        let existing = record(employee_id, 0, AttendanceStatus::Present, dec!(8));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ existing.clone() ],
            ])
            .into_connection();

        let res = insert(&db, submission(employee_id, AttendanceStatus::Present, dec!(4))).await;
        assert!(matches!(res, Err(ServiceError::DuplicateRecord)));

        // Only the duplicate lookup ran
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[actix_web::test]
    async fn test_insert() {
        let employee_id = Uuid::new_v4();
        let stored = record(employee_id, 0, AttendanceStatus::Absent, dec!(0));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![],
                vec![ stored.clone() ],
            ])
            .into_connection();

        let res = insert(&db, submission(employee_id, AttendanceStatus::Absent, dec!(8))).await.unwrap();
        assert_eq!(res, stored);
    }

    #[actix_web::test]
    async fn test_delete_paid_attendance_is_refused() {
        let mut paid = record(Uuid::new_v4(), 0, AttendanceStatus::Present, dec!(8));
        paid.payroll_id = Some(Uuid::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
            ])
            .append_query_results([
                vec![ paid.clone() ],
            ])
            .into_connection();

        let res = delete(&db, paid.id).await;
        assert!(matches!(res, Err(ServiceError::PaidRecordImmutable)));

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"DELETE FROM "attendance" WHERE "attendance"."id" = $1 AND "attendance"."payroll_id" IS NULL"#,
                [paid.id.into()]
            )
        );
    }

    #[actix_web::test]
    async fn test_delete_missing_attendance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
            ])
            .append_query_results([
                Vec::<attendance::Model>::new(),
            ])
            .into_connection();

        assert!(matches!(delete(&db, Uuid::new_v4()).await, Err(ServiceError::NotFound)));
    }

    #[actix_web::test]
    async fn test_update_paid_attendance_is_refused_without_touching_store() {
        let mut paid = record(Uuid::new_v4(), 0, AttendanceStatus::Present, dec!(8));
        paid.payroll_id = Some(Uuid::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let res = update(&db, &paid, submission(paid.employee_id, AttendanceStatus::Present, dec!(4))).await;
        assert!(matches!(res, Err(ServiceError::PaidRecordImmutable)));
        assert!(db.into_transaction_log().is_empty());
    }

    #[actix_web::test]
    async fn test_update_paid_in_between_is_refused() {
        let unpaid = record(Uuid::new_v4(), 0, AttendanceStatus::Present, dec!(8));
        let mut paid_meanwhile = unpaid.clone();
        paid_meanwhile.payroll_id = Some(Uuid::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                // UPDATE … RETURNING matched nothing
                Vec::<attendance::Model>::new(),
                vec![ paid_meanwhile ],
            ])
            .into_connection();

        let new = NewAttendance {
            employee_id: unpaid.employee_id,
            date: unpaid.date,
            status: AttendanceStatus::Present,
            hours_worked: dec!(4),
        };

        assert!(matches!(update(&db, &unpaid, new).await, Err(ServiceError::PaidRecordImmutable)));
    }

    #[actix_web::test]
    async fn test_monthly_totals() {
        let employee_id = Uuid::new_v4();
        let records = vec![
            record(employee_id, 0, AttendanceStatus::Present, dec!(8)),
            record(employee_id, 1, AttendanceStatus::Present, dec!(8)),
            record(employee_id, 2, AttendanceStatus::Absent, dec!(0)),
        ];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                records.clone(),
            ])
            .into_connection();

        let monthly = monthly_totals(&db, employee_id, 2024, 6).await.unwrap();
        assert_eq!(monthly.start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(monthly.end, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(monthly.totals, AttendanceTotals { present: 2, absent: 1, hours: dec!(16) });
        assert_eq!(monthly.records, records);

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        assert!(matches!(monthly_totals(&db, employee_id, 2024, 0).await, Err(ServiceError::Validation(_))));
    }

    #[actix_web::test]
    async fn test_stats_since() {
        let alice = Uuid::new_v4();
        let mut paid = record(alice, 0, AttendanceStatus::Present, dec!(8));
        paid.payroll_id = Some(Uuid::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![
                    paid,
                    record(alice, 1, AttendanceStatus::Present, dec!(6)),
                    record(alice, 2, AttendanceStatus::Absent, dec!(0)),
                ],
            ])
            .into_connection();

        let stats = stats_since(&db, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).await.unwrap();
        assert_eq!(stats[&alice], AttendanceStats {
            total_attendance: 3,
            present_count: 2,
            absent_count: 1,
            total_hours: dec!(14),
            unpaid_count: 2,
        });
    }
}
