use sea_orm_migration::prelude::*;

/// Table with a server generated uuid primary key
pub(crate) fn id_table_statement() -> TableCreateStatement {
    TableCreateStatement::new()
        .if_not_exists()
        .col(ColumnDef::new(DefaultColumn::Id)
            .uuid()
            .primary_key()
            .default(Expr::cust("GEN_RANDOM_UUID()"))
            .take())
        .take()
}

pub(crate) fn default_table_statement() -> TableCreateStatement {
    id_table_statement()
        .col(ColumnDef::new(DefaultColumn::CreatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .default(Expr::current_timestamp())
            .take())
        .take()
}

#[derive(DeriveIden)]
pub(crate) enum DefaultColumn {
    Id,
    CreatedAt,
}

/// Links `$column` of `$table` to the employee it belongs to
///
/// # Example
///
/// ```rs
/// manager
///     .create_table(default_table_statement()
///         .table(Attendance::Table)
///         .col(ColumnDef::new(Attendance::EmployeeId)
///             .uuid()
///             .not_null())
///         .take()
///     ).await?;
/// setup_employee_fk!(manager, Attendance::Table, Attendance::EmployeeId);
/// ```
#[macro_export]
macro_rules! setup_employee_fk {
    ($m:expr,$t:expr,$c:expr) => {{
        use crate::util::*;
        use crate::m20250701_093000_init::Employee;

        $m.create_foreign_key(ForeignKeyCreateStatement::new()
                .from($t, $c)
                .to(Employee::Table, DefaultColumn::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::Cascade)
                .take()
        ).await?;
    }};
}
