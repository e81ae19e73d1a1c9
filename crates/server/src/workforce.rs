//! Workforce operations the approval executor (and the direct HR endpoints)
//! invoke: shift assignment, monthly salary generation, day-off management.
//!
//! Each service owns validation for its aggregate and talks to storage through
//! the repository traits, so the same code runs against SQLite in production
//! and the in-memory doubles in tests.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use storeops_core::domain::employee::{Employee, EmployeeId};
use storeops_core::domain::offday::{Offday, OffdayId};
use storeops_core::domain::salary::Salary;
use storeops_core::domain::shift::{UserShift, UserShiftId};
use storeops_core::{OffdayAmend, OffdayBulk, OffdayCreate, ShiftAmend, ShiftAssign};
use storeops_db::repositories::{
    EmployeeRepository, NewOffday, NewSalary, NewUserShift, OffdayRepository, RepositoryError,
    SalaryRepository, ShiftRepository,
};

#[derive(Debug, Error)]
pub enum WorkforceError {
    #[error("Employee {0} not found")]
    EmployeeNotFound(i64),
    #[error("Employee {0} is not active")]
    EmployeeInactive(i64),
    #[error("Shift type {0} not found")]
    ShiftTypeNotFound(i64),
    #[error("Shift assignment {0} not found")]
    ShiftNotFound(i64),
    #[error("Day off {0} not found")]
    OffdayNotFound(i64),
    #[error("Employee {employee_id} already has a day off on {date}")]
    DuplicateOffday { employee_id: i64, date: NaiveDate },
    #[error("Date {date} falls outside {year}-{month:02}")]
    DateOutsideMonth { date: NaiveDate, year: i32, month: u32 },
    #[error("{year}-{month} is not a valid calendar month")]
    InvalidMonth { year: i32, month: u32 },
    #[error("A day-off batch must contain at least one date")]
    EmptyOffdayBatch,
    #[error("Salary already generated for employee {employee_id} for {month}")]
    SalaryAlreadyGenerated { employee_id: i64, month: NaiveDate },
    #[error("Employee {employee_id} joined after the salary month {month}")]
    JoinedAfterSalaryMonth { employee_id: i64, month: NaiveDate },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkforceError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

async fn require_active_employee(
    employees: &dyn EmployeeRepository,
    employee_id: EmployeeId,
) -> Result<Employee, WorkforceError> {
    let employee = employees
        .find_by_id(employee_id)
        .await?
        .ok_or(WorkforceError::EmployeeNotFound(employee_id.0))?;
    if !employee.is_active {
        return Err(WorkforceError::EmployeeInactive(employee_id.0));
    }
    Ok(employee)
}

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), WorkforceError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(WorkforceError::InvalidMonth { year, month })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(WorkforceError::InvalidMonth { year, month })?;
    Ok((first, next_first.pred_opt().unwrap_or(first)))
}

pub struct ShiftService {
    employees: Arc<dyn EmployeeRepository>,
    shifts: Arc<dyn ShiftRepository>,
}

impl ShiftService {
    pub fn new(employees: Arc<dyn EmployeeRepository>, shifts: Arc<dyn ShiftRepository>) -> Self {
        Self { employees, shifts }
    }

    /// Assign a shift, closing the employee's current active assignment the
    /// day before the new one takes effect.
    pub async fn assign(&self, assign: &ShiftAssign) -> Result<UserShift, WorkforceError> {
        let employee_id = EmployeeId(assign.employee_id);
        require_active_employee(self.employees.as_ref(), employee_id).await?;

        self.shifts
            .find_shift_type(storeops_core::ShiftTypeId(assign.shift_type_id))
            .await?
            .ok_or(WorkforceError::ShiftTypeNotFound(assign.shift_type_id))?;

        if let Some(mut current) = self.shifts.find_active_assignment(employee_id).await? {
            current.is_active = false;
            current.end_date = assign.effective_date.pred_opt();
            self.shifts.update_user_shift(current.clone()).await?;
            info!(
                event_name = "workforce.shift.assignment_closed",
                employee_id = employee_id.0,
                user_shift_id = current.id.0,
                "previous shift assignment closed"
            );
        }

        let stored = self
            .shifts
            .insert_user_shift(NewUserShift {
                employee_id,
                shift_type_id: storeops_core::ShiftTypeId(assign.shift_type_id),
                effective_date: assign.effective_date,
                end_date: assign.end_date,
                deduction_amount: assign.deduction_amount,
            })
            .await?;
        info!(
            event_name = "workforce.shift.assigned",
            employee_id = employee_id.0,
            user_shift_id = stored.id.0,
            "shift assigned"
        );
        Ok(stored)
    }

    /// Partial update of an existing assignment.
    pub async fn amend(&self, amend: &ShiftAmend) -> Result<UserShift, WorkforceError> {
        let mut shift = self
            .shifts
            .find_user_shift(UserShiftId(amend.user_shift_id))
            .await?
            .ok_or(WorkforceError::ShiftNotFound(amend.user_shift_id))?;

        if let Some(shift_type_id) = amend.shift_type_id {
            self.shifts
                .find_shift_type(storeops_core::ShiftTypeId(shift_type_id))
                .await?
                .ok_or(WorkforceError::ShiftTypeNotFound(shift_type_id))?;
            shift.shift_type_id = storeops_core::ShiftTypeId(shift_type_id);
        }
        if let Some(effective_date) = amend.effective_date {
            shift.effective_date = effective_date;
        }
        if let Some(end_date) = amend.end_date {
            shift.end_date = Some(end_date);
        }
        if let Some(deduction_amount) = amend.deduction_amount {
            shift.deduction_amount = Some(deduction_amount);
        }
        if let Some(is_active) = amend.is_active {
            shift.is_active = is_active;
        }

        self.shifts.update_user_shift(shift.clone()).await?;
        info!(
            event_name = "workforce.shift.amended",
            user_shift_id = shift.id.0,
            "shift assignment amended"
        );
        Ok(shift)
    }
}

pub struct SalaryService {
    employees: Arc<dyn EmployeeRepository>,
    shifts: Arc<dyn ShiftRepository>,
    salaries: Arc<dyn SalaryRepository>,
}

impl SalaryService {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        shifts: Arc<dyn ShiftRepository>,
        salaries: Arc<dyn SalaryRepository>,
    ) -> Self {
        Self { employees, shifts, salaries }
    }

    /// Generate the pay record for one (employee, month). Gross pay is the
    /// monthly salary, prorated by days employed when the employee joined
    /// inside the month; the active assignment's deduction amount, if any, is
    /// taken off.
    pub async fn generate_monthly(
        &self,
        employee_id: EmployeeId,
        salary_month: NaiveDate,
        generated_by: i64,
    ) -> Result<Salary, WorkforceError> {
        let employee = require_active_employee(self.employees.as_ref(), employee_id).await?;

        let month_first = salary_month.with_day(1).unwrap_or(salary_month);
        let (_, month_last) = month_bounds(month_first.year(), month_first.month())?;

        if self.salaries.find_by_employee_month(employee_id, month_first).await?.is_some() {
            return Err(WorkforceError::SalaryAlreadyGenerated {
                employee_id: employee_id.0,
                month: month_first,
            });
        }
        if employee.joining_date > month_last {
            return Err(WorkforceError::JoinedAfterSalaryMonth {
                employee_id: employee_id.0,
                month: month_first,
            });
        }

        let days_in_month = i64::from(month_last.day());
        let gross_amount = if employee.joining_date > month_first {
            let days_worked = days_in_month - i64::from(employee.joining_date.day()) + 1;
            (employee.monthly_salary * Decimal::from(days_worked) / Decimal::from(days_in_month))
                .round_dp(2)
        } else {
            employee.monthly_salary
        };

        let total_deductions = self
            .shifts
            .find_active_assignment(employee_id)
            .await?
            .and_then(|shift| shift.deduction_amount)
            .unwrap_or(Decimal::ZERO);
        let net_amount = (gross_amount - total_deductions).max(Decimal::ZERO);

        let stored = self
            .salaries
            .insert(NewSalary {
                employee_id,
                salary_month: month_first,
                gross_amount,
                total_deductions,
                net_amount,
                generated_by,
            })
            .await?;
        info!(
            event_name = "workforce.salary.generated",
            employee_id = employee_id.0,
            salary_id = stored.id.0,
            salary_month = %month_first,
            "monthly salary generated"
        );
        Ok(stored)
    }
}

/// Outcome of a whole-month day-off batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulkOffdayOutcome {
    pub first_id: OffdayId,
    pub total: i64,
}

pub struct OffdayService {
    employees: Arc<dyn EmployeeRepository>,
    offdays: Arc<dyn OffdayRepository>,
}

impl OffdayService {
    pub fn new(employees: Arc<dyn EmployeeRepository>, offdays: Arc<dyn OffdayRepository>) -> Self {
        Self { employees, offdays }
    }

    pub async fn create(&self, create: &OffdayCreate) -> Result<Offday, WorkforceError> {
        let employee_id = EmployeeId(create.employee_id);
        require_active_employee(self.employees.as_ref(), employee_id).await?;

        let (first, last) = month_bounds(create.year, create.month)?;
        if create.offday_date < first || create.offday_date > last {
            return Err(WorkforceError::DateOutsideMonth {
                date: create.offday_date,
                year: create.year,
                month: create.month,
            });
        }

        if self.offdays.find_by_employee_date(employee_id, create.offday_date).await?.is_some() {
            return Err(WorkforceError::DuplicateOffday {
                employee_id: employee_id.0,
                date: create.offday_date,
            });
        }

        let stored = self
            .offdays
            .insert(NewOffday {
                employee_id,
                year: create.year,
                month: create.month,
                offday_date: create.offday_date,
                offday_type: create.offday_type,
                description: create.description.clone(),
            })
            .await?;
        info!(
            event_name = "workforce.offday.created",
            employee_id = employee_id.0,
            offday_id = stored.id.0,
            "day off created"
        );
        Ok(stored)
    }

    /// Amend one day-off row; `year`/`month` are re-derived when the date
    /// moves.
    pub async fn amend(&self, amend: &OffdayAmend) -> Result<Offday, WorkforceError> {
        let mut offday = self
            .offdays
            .find_by_id(OffdayId(amend.offday_id))
            .await?
            .ok_or(WorkforceError::OffdayNotFound(amend.offday_id))?;

        if let Some(new_date) = amend.offday_date {
            if new_date != offday.offday_date {
                if let Some(existing) =
                    self.offdays.find_by_employee_date(offday.employee_id, new_date).await?
                {
                    if existing.id != offday.id {
                        return Err(WorkforceError::DuplicateOffday {
                            employee_id: offday.employee_id.0,
                            date: new_date,
                        });
                    }
                }
                offday.offday_date = new_date;
                offday.year = new_date.year();
                offday.month = new_date.month();
            }
        }
        if let Some(offday_type) = amend.offday_type {
            offday.offday_type = offday_type;
        }
        if let Some(description) = &amend.description {
            offday.description = Some(description.clone());
        }

        self.offdays.update(offday.clone()).await?;
        info!(
            event_name = "workforce.offday.amended",
            offday_id = offday.id.0,
            "day off amended"
        );
        Ok(offday)
    }

    /// Replace an employee's whole-month plan with the given dates.
    pub async fn create_bulk(&self, bulk: &OffdayBulk) -> Result<BulkOffdayOutcome, WorkforceError> {
        let employee_id = EmployeeId(bulk.employee_id);
        require_active_employee(self.employees.as_ref(), employee_id).await?;

        if bulk.offday_dates.is_empty() {
            return Err(WorkforceError::EmptyOffdayBatch);
        }
        let (first, last) = month_bounds(bulk.year, bulk.month)?;

        let mut dates = bulk.offday_dates.clone();
        dates.sort();
        dates.dedup();
        for date in &dates {
            if *date < first || *date > last {
                return Err(WorkforceError::DateOutsideMonth {
                    date: *date,
                    year: bulk.year,
                    month: bulk.month,
                });
            }
        }

        let rows = dates
            .iter()
            .map(|date| NewOffday {
                employee_id,
                year: bulk.year,
                month: bulk.month,
                offday_date: *date,
                offday_type: bulk.offday_type,
                description: bulk.description.clone(),
            })
            .collect();
        let stored = self.offdays.replace_month(employee_id, bulk.year, bulk.month, rows).await?;

        // replace_month only returns an empty set for an empty input, which is
        // rejected above.
        let first_id = stored
            .first()
            .map(|offday| offday.id)
            .ok_or(WorkforceError::EmptyOffdayBatch)?;
        info!(
            event_name = "workforce.offday.month_replaced",
            employee_id = employee_id.0,
            year = bulk.year,
            month = bulk.month,
            total = stored.len() as i64,
            "month day-off plan replaced"
        );
        Ok(BulkOffdayOutcome { first_id, total: stored.len() as i64 })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use storeops_core::domain::employee::EmployeeId;
    use storeops_core::domain::offday::OffdayType;
    use storeops_core::{OffdayAmend, OffdayBulk, OffdayCreate, ShiftAmend, ShiftAssign};
    use storeops_db::repositories::{
        EmployeeRepository, InMemoryEmployeeRepository, InMemoryOffdayRepository,
        InMemorySalaryRepository, InMemoryShiftRepository, NewEmployee, NewShiftType,
        OffdayRepository, ShiftRepository,
    };

    use super::{BulkOffdayOutcome, OffdayService, SalaryService, ShiftService, WorkforceError};

    fn date(text: &str) -> NaiveDate {
        text.parse().expect("test date")
    }

    struct Harness {
        employees: Arc<InMemoryEmployeeRepository>,
        shifts: Arc<InMemoryShiftRepository>,
        offdays: Arc<InMemoryOffdayRepository>,
        salaries: Arc<InMemorySalaryRepository>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                employees: Arc::new(InMemoryEmployeeRepository::default()),
                shifts: Arc::new(InMemoryShiftRepository::default()),
                offdays: Arc::new(InMemoryOffdayRepository::default()),
                salaries: Arc::new(InMemorySalaryRepository::default()),
            }
        }

        fn shift_service(&self) -> ShiftService {
            ShiftService::new(self.employees.clone(), self.shifts.clone())
        }

        fn salary_service(&self) -> SalaryService {
            SalaryService::new(self.employees.clone(), self.shifts.clone(), self.salaries.clone())
        }

        fn offday_service(&self) -> OffdayService {
            OffdayService::new(self.employees.clone(), self.offdays.clone())
        }

        async fn employee(&self, joining_date: &str, monthly_salary: i64) -> EmployeeId {
            self.employees
                .insert(NewEmployee {
                    first_name: "Hala".to_string(),
                    last_name: "Nasser".to_string(),
                    phone: "15550300".to_string(),
                    monthly_salary: Decimal::new(monthly_salary, 2),
                    joining_date: date(joining_date),
                    is_active: true,
                })
                .await
                .expect("insert employee")
                .id
        }

        async fn shift_type(&self) -> i64 {
            self.shifts
                .insert_shift_type(NewShiftType {
                    name: "Morning".to_string(),
                    start_minute: 8 * 60,
                    end_minute: 16 * 60,
                })
                .await
                .expect("insert shift type")
                .id
                .0
        }
    }

    #[tokio::test]
    async fn assigning_a_shift_closes_the_previous_assignment() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let shift_type = harness.shift_type().await;
        let service = harness.shift_service();

        let first = service
            .assign(&ShiftAssign {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-03-01"),
                end_date: None,
                deduction_amount: None,
            })
            .await
            .expect("first assignment");

        let second = service
            .assign(&ShiftAssign {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-04-01"),
                end_date: None,
                deduction_amount: Some(Decimal::new(50_00, 2)),
            })
            .await
            .expect("second assignment");

        let closed = harness
            .shifts
            .find_user_shift(first.id)
            .await
            .expect("lookup")
            .expect("first assignment still stored");
        assert!(!closed.is_active);
        assert_eq!(closed.end_date, Some(date("2025-03-31")));

        let active = harness
            .shifts
            .find_active_assignment(employee)
            .await
            .expect("lookup")
            .expect("an active assignment");
        assert_eq!(active.id, second.id);
    }

    #[tokio::test]
    async fn shift_amend_applies_only_the_given_fields() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let shift_type = harness.shift_type().await;
        let service = harness.shift_service();

        let assigned = service
            .assign(&ShiftAssign {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-03-01"),
                end_date: None,
                deduction_amount: Some(Decimal::new(25_00, 2)),
            })
            .await
            .expect("assign");

        let amended = service
            .amend(&ShiftAmend {
                user_shift_id: assigned.id.0,
                shift_type_id: None,
                effective_date: None,
                end_date: Some(date("2025-06-30")),
                deduction_amount: None,
                is_active: None,
            })
            .await
            .expect("amend");

        assert_eq!(amended.end_date, Some(date("2025-06-30")));
        assert_eq!(amended.deduction_amount, Some(Decimal::new(25_00, 2)));
        assert!(amended.is_active);
    }

    #[tokio::test]
    async fn amending_an_unknown_shift_fails() {
        let harness = Harness::new();
        let service = harness.shift_service();

        let error = service
            .amend(&ShiftAmend {
                user_shift_id: 99,
                shift_type_id: None,
                effective_date: None,
                end_date: None,
                deduction_amount: None,
                is_active: Some(false),
            })
            .await
            .expect_err("unknown shift");
        assert!(matches!(error, WorkforceError::ShiftNotFound(99)));
    }

    #[tokio::test]
    async fn salary_is_full_for_a_whole_month_of_employment() {
        let harness = Harness::new();
        let employee = harness.employee("2024-09-01", 3_000_00).await;
        let service = harness.salary_service();

        let salary = service
            .generate_monthly(employee, date("2025-03-01"), 1)
            .await
            .expect("generate");
        assert_eq!(salary.gross_amount, Decimal::new(3_000_00, 2));
        assert_eq!(salary.total_deductions, Decimal::ZERO);
        assert_eq!(salary.net_amount, Decimal::new(3_000_00, 2));
    }

    #[tokio::test]
    async fn salary_is_prorated_when_the_employee_joined_mid_month() {
        let harness = Harness::new();
        // Joined on the 16th of a 30-day month: 15 of 30 days worked.
        let employee = harness.employee("2025-04-16", 3_000_00).await;
        let service = harness.salary_service();

        let salary = service
            .generate_monthly(employee, date("2025-04-01"), 1)
            .await
            .expect("generate");
        assert_eq!(salary.gross_amount, Decimal::new(1_500_00, 2));
    }

    #[tokio::test]
    async fn salary_deducts_the_active_assignment_amount() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let shift_type = harness.shift_type().await;
        harness
            .shift_service()
            .assign(&ShiftAssign {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-01-01"),
                end_date: None,
                deduction_amount: Some(Decimal::new(120_00, 2)),
            })
            .await
            .expect("assign");

        let salary = harness
            .salary_service()
            .generate_monthly(employee, date("2025-03-15"), 1)
            .await
            .expect("generate");
        assert_eq!(salary.salary_month, date("2025-03-01"), "month is normalized to the first");
        assert_eq!(salary.total_deductions, Decimal::new(120_00, 2));
        assert_eq!(salary.net_amount, Decimal::new(2_880_00, 2));
    }

    #[tokio::test]
    async fn salary_generation_refuses_a_duplicate_month() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let service = harness.salary_service();

        service.generate_monthly(employee, date("2025-03-01"), 1).await.expect("first");
        let error = service
            .generate_monthly(employee, date("2025-03-01"), 1)
            .await
            .expect_err("duplicate month");
        assert!(matches!(error, WorkforceError::SalaryAlreadyGenerated { .. }));
    }

    #[tokio::test]
    async fn offday_creation_validates_date_and_duplicates() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let service = harness.offday_service();

        let outside = service
            .create(&OffdayCreate {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_date: date("2025-05-02"),
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect_err("date outside month");
        assert!(matches!(outside, WorkforceError::DateOutsideMonth { .. }));

        let created = service
            .create(&OffdayCreate {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_date: date("2025-04-04"),
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect("create");
        assert_eq!(created.offday_date, date("2025-04-04"));

        let duplicate = service
            .create(&OffdayCreate {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_date: date("2025-04-04"),
                offday_type: OffdayType::Leave,
                description: None,
            })
            .await
            .expect_err("duplicate date");
        assert!(matches!(duplicate, WorkforceError::DuplicateOffday { .. }));
    }

    #[tokio::test]
    async fn offday_amend_rederives_year_and_month_from_the_new_date() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let service = harness.offday_service();

        let created = service
            .create(&OffdayCreate {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_date: date("2025-04-04"),
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect("create");

        let amended = service
            .amend(&OffdayAmend {
                offday_id: created.id.0,
                offday_date: Some(date("2025-05-09")),
                offday_type: Some(OffdayType::Holiday),
                description: None,
            })
            .await
            .expect("amend");
        assert_eq!((amended.year, amended.month), (2025, 5));
        assert_eq!(amended.offday_type, OffdayType::Holiday);
    }

    #[tokio::test]
    async fn bulk_offdays_replace_the_month_and_report_first_id_and_total() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let service = harness.offday_service();

        service
            .create(&OffdayCreate {
                employee_id: employee.0,
                year: 2025,
                month: 3,
                offday_date: date("2025-03-07"),
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect("pre-existing row");

        let outcome = service
            .create_bulk(&OffdayBulk {
                employee_id: employee.0,
                year: 2025,
                month: 3,
                offday_dates: vec![date("2025-03-14"), date("2025-03-01"), date("2025-03-14")],
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect("bulk create");

        assert_eq!(outcome.total, 2, "dates are deduplicated");
        let month = harness
            .offdays
            .list_for_month(employee, 2025, 3)
            .await
            .expect("list month");
        assert_eq!(
            month.iter().map(|o| o.offday_date).collect::<Vec<_>>(),
            vec![date("2025-03-01"), date("2025-03-14")],
            "the pre-existing plan is replaced"
        );
        assert_eq!(outcome, BulkOffdayOutcome { first_id: month[0].id, total: 2 });
    }

    #[tokio::test]
    async fn bulk_offdays_reject_an_empty_batch_and_out_of_month_dates() {
        let harness = Harness::new();
        let employee = harness.employee("2024-01-01", 3_000_00).await;
        let service = harness.offday_service();

        let empty = service
            .create_bulk(&OffdayBulk {
                employee_id: employee.0,
                year: 2025,
                month: 3,
                offday_dates: vec![],
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect_err("empty batch");
        assert!(matches!(empty, WorkforceError::EmptyOffdayBatch));

        let outside = service
            .create_bulk(&OffdayBulk {
                employee_id: employee.0,
                year: 2025,
                month: 3,
                offday_dates: vec![date("2025-03-01"), date("2025-04-01")],
                offday_type: OffdayType::Weekend,
                description: None,
            })
            .await
            .expect_err("date outside month");
        assert!(matches!(outside, WorkforceError::DateOutsideMonth { .. }));
    }
}
