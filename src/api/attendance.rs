use rocket::{http::Status, response::status, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::attendance::{AttendanceUpdate, CheckIn},
        auth::{AttendanceDesk, AuthToken},
        common::attendance::{AttendanceRecord, AttendanceStats},
    },
    Assembly,
};

pub fn routes() -> Vec<Route> {
    routes![
        check_in,
        update_attendance,
        get_attendance,
        list_attendance,
        attendance_stats,
    ]
}

#[post("/attendance/<national_id>", data = "<check_in>", format = "json")]
pub async fn check_in(
    _token: AuthToken<AttendanceDesk>,
    national_id: &str,
    check_in: Json<CheckIn>,
    assembly: &State<Assembly>,
) -> Result<status::Custom<Json<AttendanceRecord>>> {
    let record = assembly
        .register_attendance(national_id, &check_in.apartment)
        .await?;
    Ok(status::Custom(Status::Created, Json(record)))
}

#[patch("/attendance/<national_id>", data = "<update>", format = "json")]
pub async fn update_attendance(
    _token: AuthToken<AttendanceDesk>,
    national_id: &str,
    update: Json<AttendanceUpdate>,
    assembly: &State<Assembly>,
) -> Result<Json<AttendanceRecord>> {
    let record = assembly
        .set_attendance_enabled(national_id, update.enabled)
        .await?;
    Ok(Json(record))
}

#[get("/attendance/<national_id>")]
pub async fn get_attendance(
    _token: AuthToken<AttendanceDesk>,
    national_id: &str,
    assembly: &State<Assembly>,
) -> Result<Json<AttendanceRecord>> {
    Ok(Json(assembly.attendance_status(national_id).await?))
}

#[get("/attendance")]
pub async fn list_attendance(
    _token: AuthToken<AttendanceDesk>,
    assembly: &State<Assembly>,
) -> Result<Json<Vec<AttendanceRecord>>> {
    Ok(Json(assembly.list_attendance().await?))
}

#[get("/attendance/stats")]
pub async fn attendance_stats(
    _token: AuthToken<AttendanceDesk>,
    assembly: &State<Assembly>,
) -> Result<Json<AttendanceStats>> {
    Ok(Json(assembly.attendance_stats().await?))
}
