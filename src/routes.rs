use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use crate::service::TableService;
use matchit::Router;

/// Utility macro generating a constant for the HTTP endpoint, and associate it with
/// an identifier. Matchit requires both
macro_rules! make_paths {
        ($($name:ident: $path:expr,)*) => {

        pub mod paths {
                    $(
                        pub const $name: &str = concat!("/api/v1", $path);
                    )*
        }
        pub mod endpoints {
            $(
                pub const $name: &str = stringify!($name);
            )*
        }

        }
    }

make_paths! {
    RESTAURANTS: "/restaurants",
    TABLES: "/restaurants/{slug}/tables",
    TABLE: "/restaurants/{slug}/tables/{label}",
    TABLE_REQUESTS: "/restaurants/{slug}/tables/{label}/requests",
    QR_CODES: "/restaurants/{slug}/qr-codes",
    REQUEST_TYPES: "/request-types",
    REQUESTS: "/requests",
    REQUEST_BY_ID: "/requests/{request_id}",
    DASHBOARD: "/dashboard",
    PHOTOS: "/photos/{*path}",
}

/// Utility to add a list of paths to the router automatically
macro_rules! add_path{
    ($router:ident $(, $path:ident)*) => {
        $(
            $router.insert(paths::$path, endpoints::$path)?;
        )*
    }
}

/// Names of the parameters in the HTTP paths, used to extract them
/// from the parameters inside of request handling
pub mod params {
    /// Slug of the restaurant
    pub const SLUG: &str = "slug";

    /// Label of a table, unique within its restaurant
    pub const LABEL: &str = "label";

    /// Key of request ids in HTTP paths
    pub const REQUEST_ID: &str = "request_id";

    /// Object path of a photo
    pub const PATH: &str = "path";
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Return the HTTP path listing the tables of a restaurant
pub fn tables(slug: &str) -> String {
    paths::TABLES.replace("{slug}", &encode(slug))
}

/// Return the HTTP path of a table page
pub fn table(slug: &str, label: &str) -> String {
    paths::TABLE
        .replace("{slug}", &encode(slug))
        .replace("{label}", &encode(label))
}

/// Return the HTTP path requests of a table are submitted to
pub fn table_requests(slug: &str, label: &str) -> String {
    paths::TABLE_REQUESTS
        .replace("{slug}", &encode(slug))
        .replace("{label}", &encode(label))
}

/// Return the HTTP path of the QR codes of a restaurant
pub fn qr_codes(slug: &str) -> String {
    paths::QR_CODES.replace("{slug}", &encode(slug))
}

/// Return the HTTP path for a request based on its id
pub fn request_by_id(request_id: u32) -> String {
    paths::REQUEST_BY_ID.replace("{request_id}", &request_id.to_string())
}

/// Return the HTTP path of a photo. Object paths only hold URL-safe characters.
pub fn photo(path: &str) -> String {
    paths::PHOTOS.replace("{*path}", path)
}

// spurious warning, I am using this in tests
#[allow(unused_macros)]
/// Utility to create easily hashmaps of parameters for testing
macro_rules! make_params {
    () => {
        std::collections::HashMap::new()
    };
    ($name:ident: $value:expr $(, $name2:ident: $value2:expr)* ) => {
        {
            let mut map = std::collections::HashMap::new();
            map.insert(params::$name.to_string(), $value.to_string());
            $(
                map.insert(params::$name2.to_string(), $value2.to_string());
            )*
            map
        }
        }
    }

#[allow(unused_imports)]
pub(crate) use make_params;

/// Create a new router with the paths defined in this module
///
/// Errors from this functions are programming errors, most likely steming from a
/// misuse of matchit
fn new_router() -> Result<Router<&'static str>> {
    let mut router = Router::new();
    add_path!(
        router,
        RESTAURANTS,
        TABLES,
        TABLE,
        TABLE_REQUESTS,
        QR_CODES,
        REQUEST_TYPES,
        REQUESTS,
        REQUEST_BY_ID,
        DASHBOARD,
        PHOTOS
    );
    Ok(router)
}

/// Type of the object containing the HTTP path parameters passed to handlers
pub type HttpParams = HashMap<String, String>;
/// Type of the function that handles HTTP requests
pub type HttpHandler = fn(Request, HttpParams, &mut TableService) -> Result<Response>;

/// Read a path parameter, failing with a bad request if it is missing
pub fn param<'a>(params: &'a HttpParams, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::BadRequest(format!("Missing {}", name)))
}

/// The router is in charge of taking in raw HTTP requests and to dispatch them to
/// the appropriate handler function.
pub struct HttpRouter {
    routes: Router<&'static str>,
    handlers: HashMap<&'static str, HashMap<&'static str, HttpHandler>>,
}

impl HttpRouter {
    /// Creates a new empty router
    ///
    /// Although the matchit router is not empty, there are no methods associated
    /// to the routes yet, so no request can be processed
    /// Errors in this function are programming errors.
    pub fn new() -> Result<Self> {
        let routes = new_router()?;
        Ok(HttpRouter {
            routes,
            handlers: HashMap::new(),
        })
    }

    /// Add a new route to the router
    pub fn add_route(&mut self, method: &'static str, route: &'static str, handler: HttpHandler) {
        let method_to_handler = self.handlers.entry(route).or_default();
        method_to_handler.insert(method, handler);
    }

    /// Sends a request to the appropriate handler if it exists
    ///
    /// If there is a route matching the request, its handler will be called and the result of the
    /// function will be the result of the handler. If no route is defined for this request,
    /// return Error::NotFound
    ///
    /// Path parameters are percent-decoded. Checking that all parameters are presents and that
    /// the body is correct is the responsibility of the handler
    pub fn route(&self, request: Request, service: &mut TableService) -> Result<Response> {
        let route = self
            .routes
            .at(request.route_path())
            .map_err(|err| Error::NotFound(err.to_string()))?;
        let method_to_handler = self.handlers.get(route.value).ok_or_else(|| {
            Error::NotFound(format!(
                "No method associated to this route: {}",
                route.value
            ))
        })?;
        let handler = method_to_handler
            .get(request.method.as_str())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No handler for {} {}",
                    request.method.as_str(),
                    route.value
                ))
            })?;

        let params = route
            .params
            .iter()
            .map(|(k, v)| {
                urlencoding::decode(v)
                    .map(|v| (k.to_string(), v.into_owned()))
                    .map_err(|_| Error::BadRequest(format!("Invalid {} in path", k)))
            })
            .collect::<Result<HttpParams>>()?;
        handler(request, params, service)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{mock::MockDB, Database};
    use crate::qr::QrGenerator;
    use crate::storage::mock::MemoryPhotoStore;

    fn service() -> TableService {
        TableService::new(
            Box::new(MockDB::new().unwrap()),
            Box::new(MemoryPhotoStore::default()),
            QrGenerator::new("http://localhost:3000"),
            false,
        )
    }

    #[test]
    fn test_routes() {
        let router = new_router().unwrap();
        assert_eq!(
            *router.at("/api/v1/restaurants").unwrap().value,
            endpoints::RESTAURANTS
        );
        assert_eq!(
            *router.at("/api/v1/restaurants/bistro/tables").unwrap().value,
            endpoints::TABLES
        );
        assert_eq!(
            *router.at("/api/v1/restaurants/bistro/tables/A1").unwrap().value,
            endpoints::TABLE
        );
        assert_eq!(
            *router
                .at("/api/v1/restaurants/bistro/tables/A1/requests")
                .unwrap()
                .value,
            endpoints::TABLE_REQUESTS
        );
        assert_eq!(
            *router.at("/api/v1/restaurants/bistro/qr-codes").unwrap().value,
            endpoints::QR_CODES
        );
        assert_eq!(
            *router.at("/api/v1/requests/7").unwrap().value,
            endpoints::REQUEST_BY_ID
        );
        assert_eq!(
            *router
                .at("/api/v1/photos/toilet-photos/toilet-1.jpg")
                .unwrap()
                .value,
            endpoints::PHOTOS
        );
    }

    #[test]
    fn test_route_params() {
        let router = new_router().unwrap();
        let route = router.at("/api/v1/restaurants/bistro/tables/A1").unwrap();
        assert_eq!(route.params.get("slug"), Some("bistro"));
        assert_eq!(route.params.get("label"), Some("A1"));

        let route = router
            .at("/api/v1/photos/toilet-photos/toilet-1.jpg")
            .unwrap();
        assert_eq!(route.params.get("path"), Some("toilet-photos/toilet-1.jpg"));
    }

    #[test]
    fn test_missing_routes() {
        let router = new_router().unwrap();
        assert!(router.at("/api/v1/missing").is_err());
        assert!(router.at("/api/v2/requests").is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(tables("bistro"), "/api/v1/restaurants/bistro/tables");
        assert_eq!(
            table("bistro", "Patio 2"),
            "/api/v1/restaurants/bistro/tables/Patio%202"
        );
        assert_eq!(
            table_requests("bistro", "A1"),
            "/api/v1/restaurants/bistro/tables/A1/requests"
        );
        assert_eq!(request_by_id(42), "/api/v1/requests/42");
        assert_eq!(
            photo("toilet-photos/toilet-1.jpg"),
            "/api/v1/photos/toilet-photos/toilet-1.jpg"
        );
    }

    #[test]
    fn test_make_params() {
        let params = make_params!(SLUG: "bistro", LABEL: "A1");
        assert_eq!(param(&params, params::SLUG).unwrap(), "bistro");
        assert_eq!(param(&params, params::LABEL).unwrap(), "A1");
        assert!(param(&params, params::REQUEST_ID).is_err());
    }

    #[test]
    fn test_router() {
        let mut service = service();

        let mut router = HttpRouter::new().unwrap();
        router.add_route("GET", endpoints::RESTAURANTS, |_, _, _| {
            Ok(Response::ok_with_body("text/plain", b"get_restaurants".to_vec()))
        });
        router.add_route("POST", endpoints::RESTAURANTS, |_, _, _| {
            Ok(Response::ok_with_body("text/plain", b"post_restaurants".to_vec()))
        });
        router.add_route("DELETE", endpoints::REQUESTS, |_, _, _| Ok(Response::ok()));

        let response = router
            .route(Request::get(paths::RESTAURANTS), &mut service)
            .unwrap();
        assert_eq!(response.body, b"get_restaurants");

        let response = router
            .route(Request::post(paths::RESTAURANTS, ""), &mut service)
            .unwrap();
        assert_eq!(response.body, b"post_restaurants");

        assert!(router
            .route(Request::delete(paths::RESTAURANTS), &mut service)
            .is_err());

        let response = router
            .route(Request::delete("/api/v1/requests?confirm=yes"), &mut service)
            .unwrap();
        assert_eq!(response.status, Some(204));
    }

    #[test]
    fn test_route_parameters_are_decoded() {
        let mut service = service();
        let mut router = HttpRouter::new().unwrap();

        router.add_route("GET", endpoints::TABLE, |_, params, _| {
            let slug = param(&params, params::SLUG)?;
            let label = param(&params, params::LABEL)?;
            Ok(Response::ok_with_body(
                "text/plain",
                format!("{}:{}", slug, label).into_bytes(),
            ))
        });

        let response = router
            .route(Request::get(&table("bistro", "Patio 2")), &mut service)
            .unwrap();

        assert_eq!(response.body, b"bistro:Patio 2");
    }
}
