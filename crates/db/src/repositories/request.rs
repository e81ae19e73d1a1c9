use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row};

use storeops_core::domain::approval::{
    ApprovalRequest, ApprovalRequestType, ApprovalResponse, ApprovalStatus, MemberId, RequestId,
    ResponseStatus,
};
use storeops_core::domain::employee::EmployeeId;
use storeops_core::RequestPayload;

use super::{parse_optional_timestamp, parse_timestamp, NewApprovalRequest, PageRequest,
    Paginated, PanelSeat, RepositoryError, RequestFilter, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_responses(
        &self,
        request_id: i64,
    ) -> Result<Vec<ApprovalResponse>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, member_id, member_employee_id, status, comments,
                    responded_at, created_at
             FROM approval_responses WHERE request_id = ? ORDER BY id",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_response).collect()
    }

    async fn hydrate(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<ApprovalRequest, RepositoryError> {
        let mut request = row_to_request(row)?;
        request.responses = self.load_responses(request.id.0).await?;
        Ok(request)
    }
}

fn row_to_response(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalResponse, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: i64 =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let member_id: i64 =
        row.try_get("member_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let member_employee_id: i64 =
        row.try_get("member_employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let responded_at_str: Option<String> =
        row.try_get("responded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalResponse {
        id,
        request_id: RequestId(request_id),
        member_id: MemberId(member_id),
        member_employee_id: EmployeeId(member_employee_id),
        status: ResponseStatus::from_str(&status_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        comments,
        responded_at: parse_optional_timestamp(responded_at_str)?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_type_str: String =
        row.try_get("request_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: i64 =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requested_by: i64 =
        row.try_get("requested_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_data_str: String =
        row.try_get("request_data").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let remarks: Option<String> =
        row.try_get("remarks").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reference_id: Option<i64> =
        row.try_get("reference_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reference_count: Option<i64> =
        row.try_get("reference_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_at_str: Option<String> =
        row.try_get("approved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejected_at_str: Option<String> =
        row.try_get("rejected_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let request_type = ApprovalRequestType::from_str(&request_type_str)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let data: serde_json::Value = serde_json::from_str(&request_data_str)
        .map_err(|e| RepositoryError::Decode(format!("request_data is not JSON: {e}")))?;
    let payload = RequestPayload::from_stored(request_type, data)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalRequest {
        id: RequestId(id),
        request_type,
        employee_id: EmployeeId(employee_id),
        requested_by,
        status: ApprovalStatus::from_str(&status_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        payload,
        remarks,
        reference_id,
        reference_count,
        approved_at: parse_optional_timestamp(approved_at_str)?,
        rejected_at: parse_optional_timestamp(rejected_at_str)?,
        created_at: parse_timestamp(&created_at_str)?,
        responses: Vec::new(),
    })
}

const REQUEST_COLUMNS: &str = "id, request_type, employee_id, requested_by, status,
        request_data, remarks, reference_id, reference_count,
        approved_at, rejected_at, created_at";

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn create(
        &self,
        request: NewApprovalRequest,
        panel: &[PanelSeat],
    ) -> Result<ApprovalRequest, RepositoryError> {
        let request_type = request.payload.request_type();
        let stored = request
            .payload
            .to_stored()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO approval_requests (request_type, employee_id, requested_by, status,
                                            request_data, remarks, created_at)
             VALUES (?, ?, ?, 'PENDING', ?, ?, ?)",
        )
        .bind(request_type.as_str())
        .bind(request.employee_id.0)
        .bind(request.requested_by)
        .bind(stored.to_string())
        .bind(&request.remarks)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let request_id = result.last_insert_rowid();
        for seat in panel {
            sqlx::query(
                "INSERT INTO approval_responses (request_id, member_id, member_employee_id,
                                                 status, created_at)
                 VALUES (?, ?, ?, 'PENDING', ?)",
            )
            .bind(request_id)
            .bind(seat.member_id.0)
            .bind(seat.employee_id.0)
            .bind(created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        match self.find_by_id(RequestId(request_id)).await? {
            Some(stored) => Ok(stored),
            None => Err(RepositoryError::Decode(format!(
                "request {request_id} missing after insert"
            ))),
        }
    }

    async fn find_by_id(
        &self,
        id: RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: RequestFilter,
    ) -> Result<Paginated<ApprovalRequest>, RepositoryError> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM approval_requests");
        count_builder.push(" WHERE 1=1");
        push_request_filters(&mut count_builder, &filter);
        let count: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query_builder =
            QueryBuilder::new(format!("SELECT {REQUEST_COLUMNS} FROM approval_requests"));
        query_builder.push(" WHERE 1=1");
        push_request_filters(&mut query_builder, &filter);
        query_builder.push(" ORDER BY created_at DESC, id DESC");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(page.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(page.offset());

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(self.hydrate(row).await?);
        }

        Ok(Paginated::new(page, count, requests))
    }

    async fn list_pending_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_requests r
             WHERE r.status = 'PENDING'
               AND EXISTS (SELECT 1 FROM approval_responses p
                           WHERE p.request_id = r.id
                             AND p.member_employee_id = ?
                             AND p.status = 'PENDING')
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(employee_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(self.hydrate(row).await?);
        }
        Ok(requests)
    }

    async fn record_response(
        &self,
        request_id: RequestId,
        member_id: MemberId,
        status: ResponseStatus,
        comments: Option<&str>,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_responses
             SET status = ?, comments = ?, responded_at = ?
             WHERE request_id = ? AND member_id = ? AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(comments)
        .bind(responded_at.to_rfc3339())
        .bind(request_id.0)
        .bind(member_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn resolve(
        &self,
        id: RequestId,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let stamp_column = match status {
            ApprovalStatus::Approved => "approved_at",
            ApprovalStatus::Rejected => "rejected_at",
            ApprovalStatus::Pending => {
                return Err(RepositoryError::Decode(
                    "a request cannot be resolved back to PENDING".to_string(),
                ))
            }
        };

        let result = sqlx::query(&format!(
            "UPDATE approval_requests
             SET status = ?, {stamp_column} = ?
             WHERE id = ? AND status = 'PENDING'"
        ))
        .bind(status.as_str())
        .bind(resolved_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn stamp_reference(
        &self,
        id: RequestId,
        reference_id: i64,
        reference_count: Option<i64>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_requests
             SET reference_id = ?, reference_count = ?
             WHERE id = ? AND reference_id IS NULL AND reference_count IS NULL",
        )
        .bind(reference_id)
        .bind(reference_count)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_pending_responses_for_member(
        &self,
        member_id: MemberId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM approval_responses WHERE member_id = ? AND status = 'PENDING'",
        )
        .bind(member_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn push_request_filters(
    builder: &mut QueryBuilder<'_, sqlx::Sqlite>,
    filter: &RequestFilter,
) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(request_type) = filter.request_type {
        builder.push(" AND request_type = ");
        builder.push_bind(request_type.as_str());
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use storeops_core::domain::approval::{
        ApprovalModule, ApprovalRequestType, ApprovalStatus, ResponseStatus,
    };
    use storeops_core::{RequestPayload, SalaryPayload, ShiftAssign, ShiftPayload};

    use super::SqlRequestRepository;
    use crate::repositories::{
        EmployeeRepository, MemberRepository, NewApprovalMember, NewApprovalRequest, NewEmployee,
        PageRequest, PanelSeat, RepositoryError, RequestFilter, RequestRepository,
        SqlEmployeeRepository, SqlMemberRepository,
    };
    use crate::{connect_with_settings, migrations};

    struct Harness {
        pool: sqlx::SqlitePool,
        requests: SqlRequestRepository,
        subject: storeops_core::EmployeeId,
        panel: Vec<PanelSeat>,
    }

    async fn setup(panel_size: usize) -> Harness {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let employees = SqlEmployeeRepository::new(pool.clone());
        let members = SqlMemberRepository::new(pool.clone());

        let subject = employees
            .insert(NewEmployee {
                first_name: "Dana".to_string(),
                last_name: "Mourad".to_string(),
                phone: "15550110".to_string(),
                monthly_salary: Decimal::new(3_000_00, 2),
                joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
                is_active: true,
            })
            .await
            .expect("insert subject")
            .id;

        let mut panel = Vec::new();
        for n in 0..panel_size {
            let reviewer = employees
                .insert(NewEmployee {
                    first_name: format!("Reviewer{n}"),
                    last_name: "Panel".to_string(),
                    phone: format!("155502{n:02}"),
                    monthly_salary: Decimal::new(5_000_00, 2),
                    joining_date: NaiveDate::from_ymd_opt(2023, 6, 1).expect("date"),
                    is_active: true,
                })
                .await
                .expect("insert reviewer");
            let member = members
                .insert(NewApprovalMember {
                    employee_id: reviewer.id,
                    module: ApprovalModule::Hr,
                    action_types: vec![ApprovalRequestType::Shift, ApprovalRequestType::Salary],
                    added_by: 1,
                })
                .await
                .expect("insert member");
            panel.push(PanelSeat { member_id: member.id, employee_id: reviewer.id });
        }

        Harness { requests: SqlRequestRepository::new(pool.clone()), pool, subject, panel }
    }

    fn salary_request(
        subject: storeops_core::EmployeeId,
    ) -> NewApprovalRequest {
        NewApprovalRequest {
            employee_id: subject,
            requested_by: 1,
            payload: RequestPayload::Salary(SalaryPayload {
                employee_id: subject.0,
                salary_month: NaiveDate::from_ymd_opt(2025, 4, 1).expect("month"),
            }),
            remarks: Some("April payroll".to_string()),
        }
    }

    #[tokio::test]
    async fn create_snapshots_the_panel_into_pending_responses() {
        let h = setup(2).await;

        let request =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create");

        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.request_type, ApprovalRequestType::Salary);
        assert_eq!(request.responses.len(), 2);
        for (response, seat) in request.responses.iter().zip(&h.panel) {
            assert_eq!(response.member_id, seat.member_id);
            assert_eq!(response.member_employee_id, seat.employee_id);
            assert_eq!(response.status, ResponseStatus::Pending);
            assert!(response.responded_at.is_none());
        }

        let reloaded = h
            .requests
            .find_by_id(request.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(reloaded.payload, request.payload);
        assert_eq!(reloaded.remarks.as_deref(), Some("April payroll"));
    }

    #[tokio::test]
    async fn shift_payload_round_trips_through_the_stored_blob() {
        let h = setup(1).await;

        let request = h
            .requests
            .create(
                NewApprovalRequest {
                    employee_id: h.subject,
                    requested_by: 1,
                    payload: RequestPayload::Shift(ShiftPayload::Assign(ShiftAssign {
                        employee_id: h.subject.0,
                        shift_type_id: 2,
                        effective_date: NaiveDate::from_ymd_opt(2025, 7, 1).expect("date"),
                        end_date: None,
                        deduction_amount: Some(Decimal::new(75_50, 2)),
                    })),
                    remarks: None,
                },
                &h.panel,
            )
            .await
            .expect("create");

        let reloaded = h
            .requests
            .find_by_id(request.id)
            .await
            .expect("find")
            .expect("exists");
        match reloaded.payload {
            RequestPayload::Shift(ShiftPayload::Assign(assign)) => {
                assert_eq!(assign.shift_type_id, 2);
                assert_eq!(assign.deduction_amount, Some(Decimal::new(75_50, 2)));
            }
            other => panic!("expected shift assignment, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn record_response_refuses_a_second_verdict() {
        let h = setup(1).await;
        let request =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create");
        let member_id = h.panel[0].member_id;

        let first = h
            .requests
            .record_response(request.id, member_id, ResponseStatus::Approved, None, Utc::now())
            .await
            .expect("record");
        assert!(first);

        let second = h
            .requests
            .record_response(
                request.id,
                member_id,
                ResponseStatus::Rejected,
                Some("changed my mind"),
                Utc::now(),
            )
            .await
            .expect("record again");
        assert!(!second);

        let reloaded = h
            .requests
            .find_by_id(request.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(reloaded.responses[0].status, ResponseStatus::Approved);
    }

    #[tokio::test]
    async fn resolve_admits_exactly_one_winner() {
        let h = setup(1).await;
        let request =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create");

        let won = h
            .requests
            .resolve(request.id, ApprovalStatus::Approved, Utc::now())
            .await
            .expect("resolve");
        assert!(won);

        let lost = h
            .requests
            .resolve(request.id, ApprovalStatus::Rejected, Utc::now())
            .await
            .expect("resolve again");
        assert!(!lost);

        let reloaded = h
            .requests
            .find_by_id(request.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(reloaded.status, ApprovalStatus::Approved);
        assert!(reloaded.approved_at.is_some());
        assert!(reloaded.rejected_at.is_none());
    }

    #[tokio::test]
    async fn reference_is_stamped_at_most_once() {
        let h = setup(1).await;
        let request =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create");
        h.requests
            .resolve(request.id, ApprovalStatus::Approved, Utc::now())
            .await
            .expect("resolve");

        assert!(h.requests.stamp_reference(request.id, 41, None).await.expect("stamp"));
        assert!(!h.requests.stamp_reference(request.id, 99, Some(3)).await.expect("restamp"));

        let reloaded = h
            .requests
            .find_by_id(request.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(reloaded.reference_id, Some(41));
        assert_eq!(reloaded.reference_count, None);
        assert!(reloaded.is_executed());
    }

    #[tokio::test]
    async fn a_corrupt_stored_timestamp_is_a_decode_error() {
        let h = setup(1).await;
        let request =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create");

        sqlx::query("UPDATE approval_requests SET created_at = 'yesterday-ish' WHERE id = ?")
            .bind(request.id.0)
            .execute(&h.pool)
            .await
            .expect("overwrite timestamp");

        let error = h
            .requests
            .find_by_id(request.id)
            .await
            .expect_err("corrupt row must not load");
        assert!(matches!(error, RepositoryError::Decode(_)));
        assert!(error.to_string().contains("yesterday-ish"));
    }

    #[tokio::test]
    async fn pending_listing_follows_open_responses() {
        let h = setup(1).await;
        let reviewer = h.panel[0].employee_id;

        let first =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create first");
        let second = h
            .requests
            .create(salary_request(h.subject), &h.panel)
            .await
            .expect("create second");

        let open = h
            .requests
            .list_pending_for_employee(reviewer)
            .await
            .expect("list pending");
        let ids: Vec<_> = open.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        h.requests
            .record_response(
                first.id,
                h.panel[0].member_id,
                ResponseStatus::Approved,
                None,
                Utc::now(),
            )
            .await
            .expect("record");

        let open = h
            .requests
            .list_pending_for_employee(reviewer)
            .await
            .expect("list pending again");
        let ids: Vec<_> = open.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id]);
    }

    #[tokio::test]
    async fn list_filters_on_status_and_counts_the_full_set() {
        let h = setup(1).await;

        let first =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create first");
        h.requests.create(salary_request(h.subject), &h.panel).await.expect("create second");
        h.requests
            .resolve(first.id, ApprovalStatus::Rejected, Utc::now())
            .await
            .expect("resolve");

        let pending = h
            .requests
            .list(
                PageRequest::default(),
                RequestFilter { status: Some(ApprovalStatus::Pending), request_type: None },
            )
            .await
            .expect("list pending");
        assert_eq!(pending.count, 1);
        assert_eq!(pending.data.len(), 1);

        let all = h
            .requests
            .list(PageRequest::new(1, 1), RequestFilter::default())
            .await
            .expect("list all");
        assert_eq!(all.count, 2);
        assert_eq!(all.data.len(), 1);
        assert_eq!(all.page_size, 1);
    }

    #[tokio::test]
    async fn member_cleanup_deletes_only_pending_responses() {
        let h = setup(1).await;
        let member_id = h.panel[0].member_id;

        let voted =
            h.requests.create(salary_request(h.subject), &h.panel).await.expect("create voted");
        h.requests.create(salary_request(h.subject), &h.panel).await.expect("create open");
        h.requests
            .record_response(voted.id, member_id, ResponseStatus::Approved, None, Utc::now())
            .await
            .expect("record");

        let removed = h
            .requests
            .delete_pending_responses_for_member(member_id)
            .await
            .expect("cleanup");
        assert_eq!(removed, 1);

        let kept: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_responses WHERE member_id = ?",
        )
        .bind(member_id.0)
        .fetch_one(&h.pool)
        .await
        .expect("count");
        assert_eq!(kept, 1);

        let voted = h
            .requests
            .find_by_id(voted.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(voted.responses.len(), 1);
        assert_eq!(voted.responses[0].status, ResponseStatus::Approved);
    }
}
