mod auth_test;
mod middleware_test;
mod reports_test;
mod users_test;
