use actix_web::web;

mod extractor;

mod appointments;
mod attendance;
mod auth;
mod dashboard;
mod employees;
mod payroll;
mod projects;
mod tasks;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/auth")
            .configure(auth::config))
        .service(web::scope("/employees")
            .configure(employees::config))
        .service(web::scope("/attendance")
            .configure(attendance::config))
        .service(web::scope("/payroll")
            .configure(payroll::config))
        .service(web::scope("/projects")
            .configure(projects::config))
        .service(web::scope("/tasks")
            .configure(tasks::config))
        .service(web::scope("/appointments")
            .configure(appointments::config))
        .configure(dashboard::config);
}
