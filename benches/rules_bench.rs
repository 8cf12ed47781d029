//! Criterion benchmarks for hot paths in the onboarding service.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - Rules-engine settle on a fully populated joint application
//!   - Application payload (de)serialization (serde_json)

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use onboardd::model::{Application, CustomerType, EmploymentType};
use onboardd::wizard::rules::settle;

fn populated_joint() -> Application {
    let mut app = Application::fresh("bench-app", CustomerType::Joint);
    settle(&mut app);
    for (i, (first, last)) in [("Jane", "Doe"), ("John", "Smith")].iter().enumerate() {
        let holder = &mut app.holders[i];
        holder.first_name = first.to_string();
        holder.last_name = last.to_string();
        holder.email = Some(format!("{}@example.com", first.to_lowercase()));
        holder.legal_residence_country = Some("PT".to_string());
        holder.identification.passport = Some(format!("AB{i}12345"));
        holder.employment_type = Some(EmploymentType::Employed);
    }
    app.account.investment_objectives = vec!["Growth".to_string(), "Income".to_string()];
    app
}

fn bench_settle(c: &mut Criterion) {
    // Settled tree: measures the steady-state no-op pass the wizard pays on
    // every edit.
    let mut settled = populated_joint();
    settle(&mut settled);
    c.bench_function("settle_steady_state", |b| {
        b.iter(|| {
            let writes = settle(black_box(&mut settled));
            black_box(writes)
        })
    });

    // Fresh tree: the full derivation cost after a burst of edits.
    c.bench_function("settle_fresh_joint", |b| {
        b.iter(|| {
            let mut app = populated_joint();
            let writes = settle(black_box(&mut app));
            black_box(writes)
        })
    });
}

fn bench_payload_round_trip(c: &mut Criterion) {
    let mut app = populated_joint();
    settle(&mut app);
    let json = serde_json::to_string(&app).expect("serialize");

    c.bench_function("application_serialize", |b| {
        b.iter(|| serde_json::to_string(black_box(&app)).expect("serialize"))
    });
    c.bench_function("application_deserialize", |b| {
        b.iter(|| {
            let app: Application = serde_json::from_str(black_box(&json)).expect("deserialize");
            black_box(app)
        })
    });
}

criterion_group!(benches, bench_settle, bench_payload_round_trip);
criterion_main!(benches);
