//! Route definitions.

use anyhow::Result;

use infinity_core::routing::{Group, RouteTable};

use crate::handlers::{admin, auth, home, pages, posts};
use crate::middleware::{AdminMiddleware, AuthMiddleware, CsrfMiddleware, MaintenanceMiddleware};
use crate::router::{handler, BoxHandler, Router};

pub fn router() -> Result<Router> {
    let mut table: RouteTable<BoxHandler> = RouteTable::new();
    table.add_global_middleware("maintenance");

    // Frontend
    table.get("/", handler(home::index))?;
    table.get("/blog", handler(posts::index))?;
    table.get("/post/{slug}", handler(posts::show))?;
    table.get("/about", handler(pages::about))?;
    table.get("/contact", handler(pages::contact))?;
    table.group(Group::new().middleware("csrf"), |t| {
        t.post("/contact", handler(pages::submit_contact))
    })?;

    // HTMX
    table.get("/api/posts/latest", handler(home::latest_posts))?;

    // Back-office
    table.group(
        Group::new().prefix("/admin").middleware("admin").middleware("csrf"),
        |t| {
            t.get("", handler(admin::dashboard::root))?;
            t.get("/dashboard", handler(admin::dashboard::index))?;
            t.get("/stats", handler(admin::dashboard::stats))?;

            t.get("/posts", handler(admin::posts::index))?;
            t.get("/posts/create", handler(admin::posts::create))?;
            t.post("/posts", handler(admin::posts::store))?;
            t.get("/posts/{id}/edit", handler(admin::posts::edit))?;
            t.post("/posts/{id}", handler(admin::posts::update))?;
            t.put("/posts/{id}", handler(admin::posts::update))?;
            t.delete("/posts/{id}", handler(admin::posts::destroy))?;

            t.get("/migrations", handler(admin::migrations::index))?;
            t.post("/migrations/run", handler(admin::migrations::run))?;
            t.post("/migrations/rollback", handler(admin::migrations::rollback))?;
            t.post("/migrations/reset", handler(admin::migrations::reset))?;
            t.get("/migrations/status", handler(admin::migrations::status))?;

            t.get("/settings", handler(admin::settings::index))?;
            t.get("/settings/create", handler(admin::settings::create))?;
            t.post("/settings/store", handler(admin::settings::store))?;
            t.get("/settings/edit", handler(admin::settings::edit))?;
            t.post("/settings/update", handler(admin::settings::update))?;
            t.post("/settings/delete", handler(admin::settings::delete))
        },
    )?;

    // Auth
    table.get("/login", handler(auth::show_login))?;
    table.post("/login", handler(auth::login))?;
    table.group(Group::new().middleware("auth"), |t| {
        t.get("/logout", handler(auth::logout))
    })?;

    Ok(Router::new(table)
        .middleware("admin", AdminMiddleware)
        .middleware("auth", AuthMiddleware)
        .middleware("csrf", CsrfMiddleware)
        .middleware("maintenance", MaintenanceMiddleware))
}
