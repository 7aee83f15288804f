use sea_orm_migration::{prelude::{extension::postgres::TypeDropStatement, *}, sea_orm::{ActiveEnum, DbBackend, DeriveActiveEnum, EnumIter, Schema}};

use crate::{setup_employee_fk, util::{default_table_statement, id_table_statement, DefaultColumn}};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(DbBackend::Postgres);

        manager.create_type(schema.create_enum_from_active_enum::<EmploymentStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<SalaryType>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<AttendanceStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<AppointmentStatus>()).await?;

        manager
            .create_table(default_table_statement()
                .table(Employee::Table)
                .col(ColumnDef::new(Employee::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Address)
                    .text()
                    .not_null()
                    .default(""))
                .col(ColumnDef::new(Employee::ContactNumber)
                    .text()
                    .not_null()
                    .default(""))
                .col(ColumnDef::new(Employee::Email)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::DateHired)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Employee::EmploymentStatus)
                    .custom(EmploymentStatus::name())
                    .not_null())
                .col(ColumnDef::new(Employee::SalaryRate)
                    .decimal_len(12, 2)
                    .not_null()
                    .check(Expr::col(Employee::SalaryRate).gt(0)))
                .col(ColumnDef::new(Employee::SalaryType)
                    .custom(SalaryType::name())
                    .not_null())
                .take()
            ).await?;

        manager
            .create_table(id_table_statement()
                .table(Payroll::Table)
                .col(ColumnDef::new(Payroll::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Payroll::TotalWorkingDays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::TotalAbsentDays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::TotalHours)
                    .decimal_len(8, 2)
                    .not_null())
                .col(ColumnDef::new(Payroll::GeneratedOn)
                    .timestamp_with_time_zone()
                    .not_null())
                .take()
            ).await?;
        setup_employee_fk!(manager, Payroll::Table, Payroll::EmployeeId);

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(Attendance::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Attendance::Status)
                    .custom(AttendanceStatus::name())
                    .not_null())
                .col(ColumnDef::new(Attendance::HoursWorked)
                    .decimal_len(5, 2)
                    .not_null()
                    .default(0)
                    .check(Expr::col(Attendance::HoursWorked).between(0, 24)))
                .col(ColumnDef::new(Attendance::PayrollId)
                    .uuid())
                .take()
            ).await?;
        setup_employee_fk!(manager, Attendance::Table, Attendance::EmployeeId);

        // Deleting a payroll must never take its attendance down with it
        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Attendance::Table, Attendance::PayrollId)
            .to(Payroll::Table, DefaultColumn::Id)
            .on_delete(ForeignKeyAction::SetNull)
            .on_update(ForeignKeyAction::Cascade)
            .take()
        ).await?;

        manager.create_index(IndexCreateStatement::new()
            .name("idx_attendance_employee_date")
            .table(Attendance::Table)
            .col(Attendance::EmployeeId)
            .col(Attendance::Date)
            .unique()
            .to_owned()
        ).await?;

        manager.create_index(IndexCreateStatement::new()
            .name("idx_attendance_payroll")
            .table(Attendance::Table)
            .col(Attendance::PayrollId)
            .to_owned()
        ).await?;

        manager
            .create_table(id_table_statement()
                .table(Project::Table)
                .col(ColumnDef::new(Project::ProjectName)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Project::ClientName)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Project::ProjectDetails)
                    .text()
                    .not_null()
                    .default(""))
                .col(ColumnDef::new(Project::ProjectCreated)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()))
                .take()
            ).await?;

        manager
            .create_table(id_table_statement()
                .table(Task::Table)
                .col(ColumnDef::new(Task::ProjectId)
                    .uuid())
                .col(ColumnDef::new(Task::AssignedTo)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Task::TaskName)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Task::TaskDetails)
                    .text()
                    .not_null()
                    .default(""))
                .col(ColumnDef::new(Task::TaskCreated)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()))
                .col(ColumnDef::new(Task::TaskDeadline)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Task::IsCompleted)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Task::CompletedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Task::AttachmentUrl)
                    .text())
                .col(ColumnDef::new(Task::AttachmentName)
                    .text())
                .col(ColumnDef::new(Task::AttachmentSize)
                    .big_integer())
                .col(ColumnDef::new(Task::AttachmentType)
                    .text())
                .take()
            ).await?;
        setup_employee_fk!(manager, Task::Table, Task::AssignedTo);

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Task::Table, Task::ProjectId)
            .to(Project::Table, DefaultColumn::Id)
            .on_delete(ForeignKeyAction::SetNull)
            .on_update(ForeignKeyAction::Cascade)
            .take()
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(Appointment::Table)
                .col(ColumnDef::new(Appointment::UpdatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()))
                .col(ColumnDef::new(Appointment::AppointmentName)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Appointment::AppointmentDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Appointment::AppointmentTime)
                    .time()
                    .not_null())
                .col(ColumnDef::new(Appointment::AssignedEmployee)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Appointment::AppointmentStatus)
                    .custom(AppointmentStatus::name())
                    .not_null())
                .col(ColumnDef::new(Appointment::AppointmentInfo)
                    .text())
                .col(ColumnDef::new(Appointment::GoogleCalendarEventId)
                    .text())
                .take()
            ).await?;
        setup_employee_fk!(manager, Appointment::Table, Appointment::AssignedEmployee);

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Appointment::Table)
                    .take()
            ).await?;

        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Task::Table)
                    .take()
            ).await?;

        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Project::Table)
                    .take()
            ).await?;

        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Attendance::Table)
                    .take()
            ).await?;

        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Payroll::Table)
                    .take()
            ).await?;

        manager
            .drop_table(
                TableDropStatement::new()
                    .table(Employee::Table)
                    .take()
            ).await?;

        manager
            .drop_type(
                TypeDropStatement::new()
                    .name(AppointmentStatus::name())
                    .to_owned()
            ).await?;

        manager
            .drop_type(
                TypeDropStatement::new()
                    .name(AttendanceStatus::name())
                    .to_owned()
            ).await?;

        manager
            .drop_type(
                TypeDropStatement::new()
                    .name(SalaryType::name())
                    .to_owned()
            ).await?;

        manager
            .drop_type(
                TypeDropStatement::new()
                    .name(EmploymentStatus::name())
                    .to_owned()
            ).await?;

        Ok(())
    }
}

#[derive(Iden)]
pub(crate) enum Employee {
    Table,
    Name,
    Address,
    ContactNumber,
    Email,
    DateHired,
    EmploymentStatus,
    SalaryRate,
    SalaryType,
}

#[derive(Iden)]
enum Attendance {
    Table,
    EmployeeId,
    Date,
    Status,
    HoursWorked,
    PayrollId,
}

#[derive(Iden)]
enum Payroll {
    Table,
    EmployeeId,
    TotalWorkingDays,
    TotalAbsentDays,
    TotalHours,
    GeneratedOn,
}

#[derive(Iden)]
enum Project {
    Table,
    ProjectName,
    ClientName,
    ProjectDetails,
    ProjectCreated,
}

#[derive(Iden)]
enum Task {
    Table,
    ProjectId,
    AssignedTo,
    TaskName,
    TaskDetails,
    TaskCreated,
    TaskDeadline,
    IsCompleted,
    CompletedAt,
    AttachmentUrl,
    AttachmentName,
    AttachmentSize,
    AttachmentType,
}

#[derive(Iden)]
enum Appointment {
    Table,
    UpdatedAt,
    AppointmentName,
    AppointmentDate,
    AppointmentTime,
    AssignedEmployee,
    AppointmentStatus,
    AppointmentInfo,
    GoogleCalendarEventId,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "employment_status")]
enum EmploymentStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "On Leave")]
    OnLeave,
    #[sea_orm(string_value = "Terminated")]
    Terminated,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "salary_type")]
enum SalaryType {
    #[sea_orm(string_value = "Monthly")]
    Monthly,
    #[sea_orm(string_value = "Daily")]
    Daily,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
enum AttendanceStatus {
    #[sea_orm(string_value = "Present")]
    Present,
    #[sea_orm(string_value = "Absent")]
    Absent,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "appointment_status")]
enum AppointmentStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Rescheduled")]
    Rescheduled,
}
