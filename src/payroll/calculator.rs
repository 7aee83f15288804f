use rust_decimal::Decimal;

use crate::{
    consts::HOURS_PER_MONTH,
    entity::{payroll, sea_orm_active_enums::SalaryType},
    error::ServiceError,
};

/// Aggregates a net pay is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayBasis {
    pub total_working_days: i32,
    pub total_hours: Decimal,
}

impl From<&payroll::Model> for PayBasis {
    fn from(payroll: &payroll::Model) -> Self {
        Self {
            total_working_days: payroll.total_working_days,
            total_hours: payroll.total_hours,
        }
    }
}

/// Daily wages pay per present day, monthly salaries pay per hour at `rate / 160`
pub fn net_pay(salary_type: SalaryType, salary_rate: Decimal, basis: PayBasis) -> Result<Decimal, ServiceError> {
    if salary_rate <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!("salary rate must be positive, got {salary_rate}")));
    }

    let pay = match salary_type {
        SalaryType::Daily => {
            if basis.total_working_days < 0 {
                return Err(ServiceError::InvalidInput(format!("working days must not be negative, got {}", basis.total_working_days)));
            }

            Decimal::from(basis.total_working_days) * salary_rate
        },
        SalaryType::Monthly => {
            if basis.total_hours < Decimal::ZERO {
                return Err(ServiceError::InvalidInput(format!("hours must not be negative, got {}", basis.total_hours)));
            }

            let hourly_rate = salary_rate / Decimal::from(HOURS_PER_MONTH);
            basis.total_hours * hourly_rate
        },
    };

    Ok(pay.round_dp(2))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn days(total_working_days: i32) -> PayBasis {
        PayBasis { total_working_days, total_hours: Decimal::ZERO }
    }

    fn hours(total_hours: Decimal) -> PayBasis {
        PayBasis { total_working_days: 0, total_hours }
    }

    #[test]
    fn test_daily() {
        assert_eq!(net_pay(SalaryType::Daily, dec!(500), days(5)).unwrap(), dec!(2500));
        assert_eq!(net_pay(SalaryType::Daily, dec!(500), days(0)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_monthly() {
        assert_eq!(net_pay(SalaryType::Monthly, dec!(16000), hours(dec!(160))).unwrap(), dec!(16000));
        assert_eq!(net_pay(SalaryType::Monthly, dec!(16000), hours(dec!(80))).unwrap(), dec!(8000));
        // 10000 / 160 = 62.5 per hour
        assert_eq!(net_pay(SalaryType::Monthly, dec!(10000), hours(dec!(7.5))).unwrap(), dec!(468.75));
    }

    #[test]
    fn test_salary_type_picks_its_aggregate() {
        let basis = PayBasis { total_working_days: 2, total_hours: dec!(16) };

        assert_eq!(net_pay(SalaryType::Daily, dec!(1000), basis).unwrap(), dec!(2000));
        assert_eq!(net_pay(SalaryType::Monthly, dec!(1600), basis).unwrap(), dec!(160));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(net_pay(SalaryType::Daily, dec!(0), days(5)), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(net_pay(SalaryType::Monthly, dec!(-1), hours(dec!(8))), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(net_pay(SalaryType::Daily, dec!(500), days(-1)), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(net_pay(SalaryType::Monthly, dec!(500), hours(dec!(-0.5))), Err(ServiceError::InvalidInput(_))));
    }
}
