//! Fixture models shared by the integration tests.

use keel_ast::{
    BinaryOp, CompareOp, Expr, HttpMethod, Model, ModelBuilder, ParamLocation, Schema,
};

/// `Derived(Base)` with `total = Base.a + Base.b`, exposed by a GET.
pub fn derived() -> Model {
    let mut builder = ModelBuilder::new();
    builder.entity("Base").attr("a", "int").attr("b", "int").done();
    builder
        .entity("Derived")
        .extends("Base")
        .computed(
            "total",
            "int",
            Expr::binary(BinaryOp::Add, Expr::path("Base.a"), Expr::path("Base.b")),
        )
        .done();
    builder
        .endpoint("totals", HttpMethod::Get, "/totals")
        .response(200, Schema::entity("Derived"))
        .done();
    builder.build()
}

/// A read-only model: a GET report over one fetched entity.
pub fn weather() -> ModelBuilder {
    let mut builder = ModelBuilder::new();
    builder
        .entity("City")
        .param("name", "str", ParamLocation::Query, "city")
        .done();
    builder.entity("Forecast").attr("city", "str").attr("temp_c", "float").done();
    builder
        .entity("Report")
        .extends("Forecast")
        .computed(
            "temp_f",
            "float",
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(
                    BinaryOp::Div,
                    Expr::binary(BinaryOp::Mul, Expr::path("Forecast.temp_c"), Expr::int(9)),
                    Expr::int(5),
                ),
                Expr::int(32),
            ),
        )
        .done();
    builder
        .rest_source("forecasts", HttpMethod::Get, "https://weather/forecast/{City.name}")
        .response(Schema::entity("Forecast"))
        .done();
    builder
        .endpoint("report", HttpMethod::Get, "/report")
        .request(Schema::entity("City"))
        .response(200, Schema::entity("Report"))
        .done();
    builder
}

/// Orders: a GET lookup feeding a computed payload posted to a write source.
pub fn shop() -> ModelBuilder {
    let mut builder = ModelBuilder::new();
    builder
        .entity("OrderRequest")
        .param("sku", "str", ParamLocation::Body, "sku")
        .param("qty", "int", ParamLocation::Body, "qty")
        .done();
    builder.entity("Product").attr("sku", "str").attr("price", "float").done();
    builder
        .entity("Order")
        .extends("OrderRequest")
        .computed(
            "total",
            "float",
            Expr::binary(
                BinaryOp::Mul,
                Expr::path("Product.price"),
                Expr::path("OrderRequest.qty"),
            ),
        )
        .done();
    builder.entity("Receipt").attr("id", "str").attr("total", "float").done();
    builder
        .rest_source("products", HttpMethod::Get, "https://shop/products/{OrderRequest.sku}")
        .header("Accept", "application/json")
        .response(Schema::entity("Product"))
        .done();
    builder
        .rest_source("create_order", HttpMethod::Post, "https://shop/orders")
        .request(Schema::entity("Order"))
        .response(Schema::entity("Receipt"))
        .done();
    builder
        .endpoint("place_order", HttpMethod::Post, "/orders")
        .request(Schema::entity("OrderRequest"))
        .response(201, Schema::entity("Receipt"))
        .error(
            409,
            "empty order",
            Expr::compare(CompareOp::LtEq, Expr::path("OrderRequest.qty"), Expr::int(0)),
        )
        .done();
    builder
}

/// `A(B)`, `B(A)`.
pub fn cyclic_parents() -> Model {
    let mut builder = ModelBuilder::new();
    builder.entity("A").extends("B").attr("x", "int").done();
    builder.entity("B").extends("A").attr("y", "int").done();
    builder.build()
}

/// A basket totalled with `map(items, i -> i.price * i.qty)`.
pub fn basket() -> Model {
    let mut builder = ModelBuilder::new();
    builder
        .entity("Basket")
        .param("items", "list", ParamLocation::Body, "items")
        .computed(
            "total",
            "float",
            Expr::call(
                "sum",
                vec![Expr::call(
                    "map",
                    vec![
                        Expr::var("items"),
                        Expr::lambda(
                            ["i"],
                            Expr::binary(
                                BinaryOp::Mul,
                                Expr::path("i.price"),
                                Expr::path("i.qty"),
                            ),
                        ),
                    ],
                )],
            ),
        )
        .done();
    builder
        .endpoint("price_basket", HttpMethod::Post, "/basket")
        .request(Schema::entity("Basket"))
        .response(200, Schema::entity("Basket"))
        .done();
    builder.build()
}

/// Streaming: a subscribed feed, a published alert and a duplex endpoint.
pub fn ticker() -> Model {
    let mut builder = ModelBuilder::new();
    builder.entity("Tick").attr("symbol", "str").attr("price", "float").done();
    builder
        .entity("Alert")
        .extends("Tick")
        .computed(
            "high",
            "bool",
            Expr::compare(CompareOp::Gt, Expr::path("Tick.price"), Expr::int(100)),
        )
        .done();
    builder
        .stream_source("ticks", "market.ticks")
        .subscribe(Schema::entity("Tick"))
        .done();
    builder
        .stream_source("alerts", "market.alerts")
        .publish(Schema::entity("Alert"))
        .done();
    builder
        .duplex("watch", "ws/watch")
        .request(Schema::entity("Tick"))
        .response(200, Schema::entity("Tick"))
        .done();
    builder.build()
}
