//! Benchmarks for query construction and T-SQL compilation.
//!
//! Benchmarks cover:
//! - building a query chain through the fluent API
//! - compiling prepared query trees of growing complexity
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use typesafe_sql::{Expression, Lambda, Model, ModelType, Query, QueryBuilder, ValueType};

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

struct User;

impl Model for User {
    fn model_type() -> ModelType {
        ModelType::builder("User")
            .field("Id", ValueType::Int)
            .field("Login", ValueType::String)
            .field("FirstName", ValueType::String)
            .field("LastName", ValueType::String)
            .field("Email", ValueType::String)
            .field("LoginAttempts", ValueType::Int)
            .build()
    }
}

struct UserRoleLink;

impl Model for UserRoleLink {
    fn model_type() -> ModelType {
        ModelType::builder("UserRoleLink")
            .field("UserId", ValueType::Int)
            .field("RoleId", ValueType::Int)
            .build()
    }
}

struct Role;

impl Model for Role {
    fn model_type() -> ModelType {
        ModelType::builder("Role")
            .field("Id", ValueType::Int)
            .field("Name", ValueType::String)
            .build()
    }
}

// ---------------------------------------------------------------------------
// Queries organized by complexity
// ---------------------------------------------------------------------------

fn simple_filter(b: &QueryBuilder) -> Query {
    let users = b.table::<User>();
    let u = users.param("u");
    users
        .filter(Lambda::unary(&u, u.field("Login").starts_with("jac")))
        .and_then(|q| q.select(Lambda::unary(&u, u.field("Email"))))
        .expect("valid query")
}

fn paged_projection(b: &QueryBuilder) -> Query {
    let users = b.table::<User>();
    let u = users.param("u");
    users
        .filter(Lambda::unary(&u, u.field("LoginAttempts").less_than(3)))
        .and_then(|q| q.order_by(Lambda::unary(&u, u.field("LastName"))))
        .and_then(|q| q.then_by(Lambda::unary(&u, u.field("FirstName"))))
        .and_then(|q| {
            q.select(Lambda::unary(
                &u,
                Expression::record([
                    ("Name", (u.field("FirstName") + " ") + u.field("LastName")),
                    ("Email", u.field("Email")),
                ]),
            ))
        })
        .and_then(|q| q.skip(20))
        .and_then(|q| q.take(10))
        .expect("valid query")
}

fn multi_join(b: &QueryBuilder) -> Query {
    let users = b.table::<User>();
    let links = b.table::<UserRoleLink>();
    let roles = b.table::<Role>();
    let u = users.param("u");
    let l = links.param("l");
    let r = roles.param("r");

    let joined = users
        .join(
            links,
            Lambda::unary(&u, u.field("Id")),
            Lambda::unary(&l, l.field("UserId")),
            Lambda::binary(&u, &l, Expression::record([("u", u.expr()), ("l", l.expr())])),
        )
        .expect("valid join");
    let t = joined.param("t");
    joined
        .join(
            roles,
            Lambda::unary(&t, t.field("l").field("RoleId")),
            Lambda::unary(&r, r.field("Id")),
            Lambda::binary(
                &t,
                &r,
                Expression::record([
                    ("Login", t.field("u").field("Login")),
                    ("Role", r.field("Name")),
                ]),
            ),
        )
        .expect("valid join")
}

fn grouped(b: &QueryBuilder) -> Query {
    let links = b.table::<UserRoleLink>();
    let l = links.param("l");
    let q = links
        .group_by(Lambda::unary(&l, l.field("UserId")))
        .expect("valid group");
    let g = q.param("g");
    let x = typesafe_sql::Param::of::<UserRoleLink>("x");
    q.filter(Lambda::unary(&g, g.expr().count().greater_than(1)))
        .and_then(|q| {
            q.select(Lambda::unary(
                &g,
                Expression::record([
                    ("UserId", g.expr().key()),
                    ("Roles", g.expr().count_of(Lambda::unary(&x, x.field("RoleId")))),
                ]),
            ))
        })
        .expect("valid query")
}

fn set_operation(b: &QueryBuilder) -> Query {
    let login = |name: &str| {
        let users = b.table::<User>();
        let u = users.param("u");
        users
            .filter(Lambda::unary(&u, u.field("Login").equals(name)))
            .expect("valid filter")
    };
    let union = login("jacenty").union(login("kasia")).except(login("admin"));
    let u = union.param("u");
    union
        .filter(Lambda::unary(&u, u.field("LoginAttempts").equals(0)))
        .expect("valid filter")
}

// ---------------------------------------------------------------------------
// Benchmark groups
// ---------------------------------------------------------------------------

fn bench_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("building");
    let builder = QueryBuilder::new();

    group.bench_function("simple_filter", |b| {
        b.iter(|| simple_filter(black_box(&builder)))
    });
    group.bench_function("multi_join", |b| b.iter(|| multi_join(black_box(&builder))));

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");
    let builder = QueryBuilder::new();

    let cases = [
        ("simple_filter", simple_filter(&builder)),
        ("paged_projection", paged_projection(&builder)),
        ("multi_join", multi_join(&builder)),
        ("grouped", grouped(&builder)),
        ("set_operation", set_operation(&builder)),
    ];

    for (name, query) in &cases {
        group.bench_with_input(BenchmarkId::new("to_sql", name), query, |b, query| {
            b.iter(|| black_box(query).to_sql())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_building, bench_compilation);
criterion_main!(benches);
