//! In-memory repository doubles for service and handler tests. Ids are
//! assigned from a per-store counter so they line up with SQLite's rowid
//! behavior.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use storeops_core::domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequest, ApprovalRequestType, ApprovalResponse,
    ApprovalSetting, ApprovalStatus, MemberId, RequestId, ResponseStatus,
};
use storeops_core::domain::employee::{Employee, EmployeeId};
use storeops_core::domain::offday::{Offday, OffdayId};
use storeops_core::domain::salary::{Salary, SalaryId};
use storeops_core::domain::shift::{ShiftType, ShiftTypeId, UserShift, UserShiftId};

use super::{
    EmployeeRepository, MemberFilter, MemberRepository, NewApprovalMember, NewApprovalRequest,
    NewEmployee, NewOffday, NewSalary, NewShiftType, NewUserShift, OffdayRepository, PageRequest,
    Paginated, PanelSeat, RepositoryError, RequestFilter, RequestRepository, SalaryRepository,
    SettingsRepository, ShiftRepository,
};

struct Table<T> {
    next_id: i64,
    rows: HashMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    table: RwLock<Table<Employee>>,
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let stored = Employee {
            id: EmployeeId(id),
            first_name: employee.first_name,
            last_name: employee.last_name,
            phone: employee.phone,
            monthly_salary: employee.monthly_salary,
            joining_date: employee.joining_date,
            is_active: employee.is_active,
            created_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError> {
        let table = self.table.read().await;
        let mut active: Vec<Employee> =
            table.rows.values().filter(|e| e.is_active).cloned().collect();
        active.sort_by_key(|e| e.id.0);
        Ok(active)
    }
}

#[derive(Default)]
pub struct InMemoryShiftRepository {
    shift_types: RwLock<Table<ShiftType>>,
    user_shifts: RwLock<Table<UserShift>>,
}

#[async_trait::async_trait]
impl ShiftRepository for InMemoryShiftRepository {
    async fn find_shift_type(
        &self,
        id: ShiftTypeId,
    ) -> Result<Option<ShiftType>, RepositoryError> {
        let table = self.shift_types.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn insert_shift_type(
        &self,
        shift_type: NewShiftType,
    ) -> Result<ShiftType, RepositoryError> {
        let mut table = self.shift_types.write().await;
        let id = table.allocate();
        let stored = ShiftType {
            id: ShiftTypeId(id),
            name: shift_type.name,
            start_minute: shift_type.start_minute,
            end_minute: shift_type.end_minute,
            is_active: true,
            created_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_user_shift(
        &self,
        id: UserShiftId,
    ) -> Result<Option<UserShift>, RepositoryError> {
        let table = self.user_shifts.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn find_active_assignment(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<UserShift>, RepositoryError> {
        let table = self.user_shifts.read().await;
        let mut candidates: Vec<&UserShift> = table
            .rows
            .values()
            .filter(|s| s.employee_id == employee_id && s.is_active)
            .collect();
        candidates.sort_by_key(|s| (s.effective_date, s.id.0));
        Ok(candidates.last().map(|s| (*s).clone()))
    }

    async fn insert_user_shift(
        &self,
        assignment: NewUserShift,
    ) -> Result<UserShift, RepositoryError> {
        let mut table = self.user_shifts.write().await;
        let id = table.allocate();
        let stored = UserShift {
            id: UserShiftId(id),
            employee_id: assignment.employee_id,
            shift_type_id: assignment.shift_type_id,
            effective_date: assignment.effective_date,
            end_date: assignment.end_date,
            deduction_amount: assignment.deduction_amount,
            is_active: true,
            created_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_user_shift(&self, assignment: UserShift) -> Result<(), RepositoryError> {
        let mut table = self.user_shifts.write().await;
        table.rows.insert(assignment.id.0, assignment);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOffdayRepository {
    table: RwLock<Table<Offday>>,
}

#[async_trait::async_trait]
impl OffdayRepository for InMemoryOffdayRepository {
    async fn find_by_id(&self, id: OffdayId) -> Result<Option<Offday>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn find_by_employee_date(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Offday>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|o| o.employee_id == employee_id && o.offday_date == date)
            .cloned())
    }

    async fn list_for_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Vec<Offday>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<Offday> = table
            .rows
            .values()
            .filter(|o| o.employee_id == employee_id && o.year == year && o.month == month)
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.offday_date);
        Ok(rows)
    }

    async fn insert(&self, offday: NewOffday) -> Result<Offday, RepositoryError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let stored = Offday {
            id: OffdayId(id),
            employee_id: offday.employee_id,
            year: offday.year,
            month: offday.month,
            offday_date: offday.offday_date,
            offday_type: offday.offday_type,
            description: offday.description,
            created_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, offday: Offday) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        table.rows.insert(offday.id.0, offday);
        Ok(())
    }

    async fn replace_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
        offdays: Vec<NewOffday>,
    ) -> Result<Vec<Offday>, RepositoryError> {
        let mut table = self.table.write().await;
        table
            .rows
            .retain(|_, o| !(o.employee_id == employee_id && o.year == year && o.month == month));

        let mut stored = Vec::with_capacity(offdays.len());
        for offday in offdays {
            let id = table.allocate();
            let row = Offday {
                id: OffdayId(id),
                employee_id: offday.employee_id,
                year: offday.year,
                month: offday.month,
                offday_date: offday.offday_date,
                offday_type: offday.offday_type,
                description: offday.description,
                created_at: Utc::now(),
            };
            table.rows.insert(id, row.clone());
            stored.push(row);
        }
        Ok(stored)
    }
}

#[derive(Default)]
pub struct InMemorySalaryRepository {
    table: RwLock<Table<Salary>>,
}

#[async_trait::async_trait]
impl SalaryRepository for InMemorySalaryRepository {
    async fn find_by_employee_month(
        &self,
        employee_id: EmployeeId,
        salary_month: NaiveDate,
    ) -> Result<Option<Salary>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|s| s.employee_id == employee_id && s.salary_month == salary_month)
            .cloned())
    }

    async fn insert(&self, salary: NewSalary) -> Result<Salary, RepositoryError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let stored = Salary {
            id: SalaryId(id),
            employee_id: salary.employee_id,
            salary_month: salary.salary_month,
            gross_amount: salary.gross_amount,
            total_deductions: salary.total_deductions,
            net_amount: salary.net_amount,
            generated_by: salary.generated_by,
            generated_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    table: RwLock<Table<ApprovalSetting>>,
}

#[async_trait::async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Option<ApprovalSetting>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|s| s.module == module && s.action_type == action_type)
            .cloned())
    }

    async fn upsert(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
        is_enabled: bool,
        updated_by: i64,
    ) -> Result<ApprovalSetting, RepositoryError> {
        let mut table = self.table.write().await;
        let existing_id = table
            .rows
            .values()
            .find(|s| s.module == module && s.action_type == action_type)
            .map(|s| s.id);
        let id = existing_id.unwrap_or_else(|| table.allocate());
        let stored = ApprovalSetting {
            id,
            module,
            action_type,
            is_enabled,
            updated_by,
            updated_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<ApprovalSetting>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalSetting> = table.rows.values().cloned().collect();
        rows.sort_by_key(|s| (s.module.as_str(), s.action_type.as_str()));
        Ok(rows)
    }
}

fn sort_action_types(action_types: &mut Vec<ApprovalRequestType>) {
    action_types.sort_by_key(|a| a.as_str());
    action_types.dedup();
}

#[derive(Default)]
pub struct InMemoryMemberRepository {
    table: RwLock<Table<ApprovalMember>>,
}

#[async_trait::async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<ApprovalMember>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn find_active(
        &self,
        employee_id: EmployeeId,
        module: ApprovalModule,
    ) -> Result<Option<ApprovalMember>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|m| m.employee_id == employee_id && m.module == module && m.is_active)
            .cloned())
    }

    async fn list_eligible(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Vec<ApprovalMember>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalMember> = table
            .rows
            .values()
            .filter(|m| m.module == module && m.is_active && m.action_types.contains(&action_type))
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.id.0));
        Ok(rows)
    }

    async fn insert(&self, member: NewApprovalMember) -> Result<ApprovalMember, RepositoryError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let mut action_types = member.action_types;
        sort_action_types(&mut action_types);
        let stored = ApprovalMember {
            id: MemberId(id),
            employee_id: member.employee_id,
            module: member.module,
            action_types,
            is_active: true,
            added_by: member.added_by,
            created_at: Utc::now(),
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn add_action_types(
        &self,
        id: MemberId,
        action_types: &[ApprovalRequestType],
    ) -> Result<ApprovalMember, RepositoryError> {
        let mut table = self.table.write().await;
        let member = table
            .rows
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::Decode(format!("member {} not found", id.0)))?;
        member.action_types.extend_from_slice(action_types);
        sort_action_types(&mut member.action_types);
        Ok(member.clone())
    }

    async fn delete(&self, id: MemberId) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        table.rows.remove(&id.0);
        Ok(())
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: MemberFilter,
    ) -> Result<Paginated<ApprovalMember>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalMember> = table
            .rows
            .values()
            .filter(|m| {
                filter.module.is_none_or(|module| m.module == module)
                    && filter.is_active.is_none_or(|active| m.is_active == active)
                    && filter
                        .action_type
                        .is_none_or(|action| m.action_types.contains(&action))
            })
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.id.0));

        let count = rows.len() as i64;
        let offset = page.offset() as usize;
        let data: Vec<ApprovalMember> =
            rows.into_iter().skip(offset).take(page.limit() as usize).collect();
        Ok(Paginated::new(page, count, data))
    }

    async fn list_all_active(&self) -> Result<Vec<ApprovalMember>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalMember> =
            table.rows.values().filter(|m| m.is_active).cloned().collect();
        rows.sort_by_key(|m| (m.module.as_str(), m.created_at, m.id.0));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    table: RwLock<Table<ApprovalRequest>>,
    next_response_id: RwLock<i64>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn create(
        &self,
        request: NewApprovalRequest,
        panel: &[PanelSeat],
    ) -> Result<ApprovalRequest, RepositoryError> {
        let created_at = Utc::now();
        let mut table = self.table.write().await;
        let mut next_response_id = self.next_response_id.write().await;
        let id = table.allocate();

        let mut responses = Vec::with_capacity(panel.len());
        for seat in panel {
            *next_response_id += 1;
            responses.push(ApprovalResponse {
                id: *next_response_id,
                request_id: RequestId(id),
                member_id: seat.member_id,
                member_employee_id: seat.employee_id,
                status: ResponseStatus::Pending,
                comments: None,
                responded_at: None,
                created_at,
            });
        }

        let stored = ApprovalRequest {
            id: RequestId(id),
            request_type: request.payload.request_type(),
            employee_id: request.employee_id,
            requested_by: request.requested_by,
            status: ApprovalStatus::Pending,
            payload: request.payload,
            remarks: request.remarks,
            reference_id: None,
            reference_count: None,
            approved_at: None,
            rejected_at: None,
            created_at,
            responses,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(
        &self,
        id: RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: RequestFilter,
    ) -> Result<Paginated<ApprovalRequest>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalRequest> = table
            .rows
            .values()
            .filter(|r| {
                filter.status.is_none_or(|status| r.status == status)
                    && filter
                        .request_type
                        .is_none_or(|request_type| r.request_type == request_type)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id.0)));

        let count = rows.len() as i64;
        let offset = page.offset() as usize;
        let data: Vec<ApprovalRequest> =
            rows.into_iter().skip(offset).take(page.limit() as usize).collect();
        Ok(Paginated::new(page, count, data))
    }

    async fn list_pending_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<ApprovalRequest> = table
            .rows
            .values()
            .filter(|r| {
                r.status == ApprovalStatus::Pending
                    && r.responses.iter().any(|p| {
                        p.member_employee_id == employee_id && p.status == ResponseStatus::Pending
                    })
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id.0)));
        Ok(rows)
    }

    async fn record_response(
        &self,
        request_id: RequestId,
        member_id: MemberId,
        status: ResponseStatus,
        comments: Option<&str>,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        let Some(request) = table.rows.get_mut(&request_id.0) else {
            return Ok(false);
        };
        let Some(response) = request
            .responses
            .iter_mut()
            .find(|p| p.member_id == member_id && p.status == ResponseStatus::Pending)
        else {
            return Ok(false);
        };

        response.status = status;
        response.comments = comments.map(str::to_string);
        response.responded_at = Some(responded_at);
        Ok(true)
    }

    async fn resolve(
        &self,
        id: RequestId,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        let Some(request) = table.rows.get_mut(&id.0) else {
            return Ok(false);
        };
        if request.status != ApprovalStatus::Pending {
            return Ok(false);
        }

        match status {
            ApprovalStatus::Approved => request.approved_at = Some(resolved_at),
            ApprovalStatus::Rejected => request.rejected_at = Some(resolved_at),
            ApprovalStatus::Pending => {
                return Err(RepositoryError::Decode(
                    "a request cannot be resolved back to PENDING".to_string(),
                ))
            }
        }
        request.status = status;
        Ok(true)
    }

    async fn stamp_reference(
        &self,
        id: RequestId,
        reference_id: i64,
        reference_count: Option<i64>,
    ) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        let Some(request) = table.rows.get_mut(&id.0) else {
            return Ok(false);
        };
        if request.reference_id.is_some() || request.reference_count.is_some() {
            return Ok(false);
        }

        request.reference_id = Some(reference_id);
        request.reference_count = reference_count;
        Ok(true)
    }

    async fn delete_pending_responses_for_member(
        &self,
        member_id: MemberId,
    ) -> Result<u64, RepositoryError> {
        let mut table = self.table.write().await;
        let mut removed = 0;
        for request in table.rows.values_mut() {
            let before = request.responses.len();
            request
                .responses
                .retain(|p| !(p.member_id == member_id && p.status == ResponseStatus::Pending));
            removed += (before - request.responses.len()) as u64;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use storeops_core::domain::approval::{
        ApprovalModule, ApprovalRequestType, ApprovalStatus, MemberId, ResponseStatus,
    };
    use storeops_core::domain::employee::EmployeeId;
    use storeops_core::{RequestPayload, SalaryPayload};

    use crate::repositories::{
        EmployeeRepository, InMemoryEmployeeRepository, InMemoryMemberRepository,
        InMemoryRequestRepository, MemberRepository, NewApprovalMember, NewApprovalRequest,
        NewEmployee, PanelSeat, RequestRepository,
    };

    #[tokio::test]
    async fn in_memory_employee_repo_round_trip() {
        let repo = InMemoryEmployeeRepository::default();
        let stored = repo
            .insert(NewEmployee {
                first_name: "Hala".to_string(),
                last_name: "Nasser".to_string(),
                phone: "15550300".to_string(),
                monthly_salary: Decimal::new(2_500_00, 2),
                joining_date: NaiveDate::from_ymd_opt(2024, 9, 1).expect("date"),
                is_active: true,
            })
            .await
            .expect("insert");

        let found = repo.find_by_id(stored.id).await.expect("find");
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn in_memory_member_repo_unions_action_types() {
        let repo = InMemoryMemberRepository::default();
        let member = repo
            .insert(NewApprovalMember {
                employee_id: EmployeeId(4),
                module: ApprovalModule::Hr,
                action_types: vec![ApprovalRequestType::Shift],
                added_by: 1,
            })
            .await
            .expect("insert");

        let widened = repo
            .add_action_types(member.id, &[ApprovalRequestType::Shift, ApprovalRequestType::Dayoff])
            .await
            .expect("widen");
        assert_eq!(
            widened.action_types,
            vec![ApprovalRequestType::Dayoff, ApprovalRequestType::Shift]
        );
    }

    #[tokio::test]
    async fn in_memory_request_repo_mirrors_the_sql_state_machine() {
        let repo = InMemoryRequestRepository::default();
        let panel = [
            PanelSeat { member_id: MemberId(1), employee_id: EmployeeId(10) },
            PanelSeat { member_id: MemberId(2), employee_id: EmployeeId(11) },
        ];

        let request = repo
            .create(
                NewApprovalRequest {
                    employee_id: EmployeeId(4),
                    requested_by: 1,
                    payload: RequestPayload::Salary(SalaryPayload {
                        employee_id: 4,
                        salary_month: NaiveDate::from_ymd_opt(2025, 3, 1).expect("month"),
                    }),
                    remarks: None,
                },
                &panel,
            )
            .await
            .expect("create");
        assert_eq!(request.responses.len(), 2);

        assert!(repo
            .record_response(request.id, MemberId(1), ResponseStatus::Approved, None, Utc::now())
            .await
            .expect("record"));
        assert!(!repo
            .record_response(request.id, MemberId(1), ResponseStatus::Rejected, None, Utc::now())
            .await
            .expect("record again"));

        assert!(repo
            .resolve(request.id, ApprovalStatus::Approved, Utc::now())
            .await
            .expect("resolve"));
        assert!(!repo
            .resolve(request.id, ApprovalStatus::Rejected, Utc::now())
            .await
            .expect("resolve again"));

        assert!(repo.stamp_reference(request.id, 7, None).await.expect("stamp"));
        assert!(!repo.stamp_reference(request.id, 8, None).await.expect("restamp"));
    }
}
