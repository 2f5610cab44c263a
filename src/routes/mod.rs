pub mod dispatch_routes;
