//! A tiny demo that logs into a real planner server and prints today's page.
//!
//! Expects `PLANNER_URL`, `PLANNER_EMAIL` and `PLANNER_PASSWORD` in the environment.

use ring_binder::client::RemoteServer;
use ring_binder::traits::Credentials;
use ring_binder::{Config, Planner};

#[tokio::main]
async fn main() {
    env_logger::init();

    let url = std::env::var("PLANNER_URL").expect("PLANNER_URL is not set");
    let email = std::env::var("PLANNER_EMAIL").expect("PLANNER_EMAIL is not set");
    let password = std::env::var("PLANNER_PASSWORD").expect("PLANNER_PASSWORD is not set");

    let server = RemoteServer::new(&url).unwrap();
    let planner = Planner::new(server, Config::default());

    let today = chrono::Local::now().date_naive();
    planner
        .log_in(&Credentials::new(&email, &password), today)
        .await
        .unwrap();

    let record = planner.record().unwrap();
    println!("# {}", record.date);
    println!("notes:   {}", record.notes);
    println!("tracker: {}", record.tracker);
    for task in &record.tasks {
        let check = if task.checked { "x" } else { " " };
        println!("  [{}] ({:?}) {}", check, task.priority, task.description);
    }
    for appointment in &record.appointments {
        println!("  {}\t{}", appointment.time, appointment.text);
    }

    planner.log_out().await;
}
