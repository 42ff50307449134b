use chrono::Utc;

use crate::api::{Cleared, NewRestaurant, NewServiceRequest, NewTable, StatusUpdate};
use crate::catalog::RequestType;
use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use crate::routes::*;
use crate::service::TableService;
use crate::status::RequestFilter;

pub fn create_http_router() -> Result<HttpRouter> {
    let mut router = HttpRouter::new()?;

    router.add_route("GET", endpoints::RESTAURANTS, get_restaurants);
    router.add_route("POST", endpoints::RESTAURANTS, post_restaurant);
    router.add_route("GET", endpoints::TABLES, get_tables);
    router.add_route("POST", endpoints::TABLES, post_table);
    router.add_route("GET", endpoints::TABLE, get_table_page);
    router.add_route("POST", endpoints::TABLE_REQUESTS, post_table_request);
    router.add_route("GET", endpoints::QR_CODES, get_qr_codes);
    router.add_route("GET", endpoints::REQUEST_TYPES, get_request_types);
    router.add_route("GET", endpoints::REQUESTS, get_requests);
    router.add_route("DELETE", endpoints::REQUESTS, delete_requests);
    router.add_route("PATCH", endpoints::REQUEST_BY_ID, patch_request);
    router.add_route("GET", endpoints::DASHBOARD, get_dashboard);
    router.add_route("POST", endpoints::PHOTOS, post_photo);
    router.add_route("GET", endpoints::PHOTOS, get_photo);

    Ok(router)
}

/// Parse the `status` and `table` query parameters of request listings
fn request_filter(request: &Request) -> Result<RequestFilter> {
    let query = request.query();
    let status = match query.get("status").map(String::as_str) {
        None | Some("") | Some("all") => None,
        Some(status) => Some(status.parse()?),
    };
    let table_id = query
        .get("table")
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u32>()
                .map_err(|err| Error::BadRequest(format!("Invalid table: {}", err)))
        })
        .transpose()?;
    Ok(RequestFilter { status, table_id })
}

fn get_restaurants(_: Request, _: HttpParams, service: &mut TableService) -> Result<Response> {
    Response::json(200, &service.restaurants()?)
}

fn post_restaurant(request: Request, _: HttpParams, service: &mut TableService) -> Result<Response> {
    let body: NewRestaurant = request.json()?;
    Response::json(201, &service.create_restaurant(&body.name, &body.slug)?)
}

fn get_tables(_: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let slug = param(&params, params::SLUG)?;
    Response::json(200, &service.tables(slug)?)
}

fn post_table(request: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let slug = param(&params, params::SLUG)?;
    let body: NewTable = request.json()?;
    Response::json(201, &service.create_table(slug, &body)?)
}

fn get_table_page(_: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let slug = param(&params, params::SLUG)?;
    let label = param(&params, params::LABEL)?;
    Response::json(200, &service.open_table(slug, label, Utc::now())?)
}

fn post_table_request(
    request: Request,
    params: HttpParams,
    service: &mut TableService,
) -> Result<Response> {
    let slug = param(&params, params::SLUG)?;
    let label = param(&params, params::LABEL)?;
    let body: NewServiceRequest = request.json()?;
    let (_, table) = service.resolve_table(slug, label)?;
    let created = service.submit_request(
        table.id,
        body.request_type,
        body.photo_url.as_deref(),
        Utc::now(),
    )?;
    Response::json(201, &created)
}

fn get_qr_codes(request: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let slug = param(&params, params::SLUG)?;
    let selection = request.query_list("tables");
    Response::json(200, &service.qr_codes(slug, &selection)?)
}

fn get_request_types(_: Request, _: HttpParams, _: &mut TableService) -> Result<Response> {
    let catalog: Vec<_> = RequestType::ALL.iter().map(RequestType::info).collect();
    Response::json(200, &catalog)
}

fn get_requests(request: Request, _: HttpParams, service: &mut TableService) -> Result<Response> {
    let filter = request_filter(&request)?;
    Response::json(200, &service.requests(&filter)?)
}

fn delete_requests(_: Request, _: HttpParams, service: &mut TableService) -> Result<Response> {
    let deleted = service.clear_requests()?;
    Response::json(200, &Cleared { deleted })
}

fn patch_request(request: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let request_id = param(&params, params::REQUEST_ID)?
        .parse::<u32>()
        .map_err(|err| Error::BadRequest(format!("Invalid request id: {}", err)))?;
    let body: StatusUpdate = request.json()?;
    Response::json(200, &service.update_status(request_id, body.status)?)
}

fn get_dashboard(request: Request, _: HttpParams, service: &mut TableService) -> Result<Response> {
    let filter = request_filter(&request)?;
    Response::json(200, &service.dashboard(&filter)?)
}

fn post_photo(request: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let file_name = param(&params, params::PATH)?;
    Response::json(201, &service.upload_photo(file_name, &request.body, Utc::now())?)
}

fn get_photo(_: Request, params: HttpParams, service: &mut TableService) -> Result<Response> {
    let path = param(&params, params::PATH)?;
    let bytes = service.photo(path)?;
    Ok(Response::ok_with_body(content_type(path), bytes))
}

/// Content type of a stored photo, from its extension
fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
