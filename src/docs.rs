use crate::api::leave::DecideRequest;
use crate::auth::handlers::{LoginRequest, MeResponse};
use crate::directory::{CreatePrincipal, ManagerOption, PrincipalDto};
use crate::model::leave_request::{LeaveStatus, LeaveType};
use crate::model::role::{Role, RoleSet};
use crate::workflow::{LeaveDto, SubmitLeave};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OA Portal API",
        version = "1.0.0",
        description = r#"
## Office Automation Portal

Internal portal backend for employees and administrators.

### Key Features
- **Session Authentication**
  - Cookie-held opaque session tokens, restored on every client startup via `/auth/me`
- **Leave Management**
  - Submit requests routed to the applicant's manager, approve/reject with an exactly-once decision
- **Attendance Management**
  - Daily check-in and check-out tracking
- **Staff Management**
  - Admin-only principal creation, deletion, and manager routing

### Security
All endpoints except `/auth/login` require a valid session cookie
(`oa_session`) or `Authorization: Bearer` token. Role-gated endpoints are
enforced server-side regardless of what a client renders.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::me,
        crate::auth::handlers::logout,

        crate::api::leave::submit_leave,
        crate::api::leave::my_leaves,
        crate::api::leave::to_approve,
        crate::api::leave::all_pending,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::delete_user,
        crate::api::users::manager_candidates
    ),
    components(
        schemas(
            LoginRequest,
            MeResponse,
            Role,
            RoleSet,
            LeaveType,
            LeaveStatus,
            SubmitLeave,
            DecideRequest,
            LeaveDto,
            CreatePrincipal,
            PrincipalDto,
            ManagerOption
        )
    ),
    tags(
        (name = "Auth", description = "Session lifecycle APIs"),
        (name = "Leave", description = "Leave workflow APIs"),
        (name = "Attendance", description = "Attendance APIs"),
        (name = "Users", description = "Staff management APIs"),
    )
)]
pub struct ApiDoc;
