pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::app::{json_config, path_config};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::me)
                .service(users::update_me)
                .service(users::delete_me)
                .service(users::upload_avatar)
                .service(users::delete_avatar)
                .service(users::get_avatar),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
