//! Postgres-backed checks of the conditional writes.
//!
//! Ignored by default because they need a database. Run with:
//! `DATABASE_URL=postgres://... cargo test -p dispatch-core -- --ignored`

use dispatch_core::entities::order::{
    CreateOrderWithItems, DeactivateOrder, GetOrderDetails, ListOrders, UpdateOrderDetails,
};
use dispatch_core::entities::order_item::{AddOrderItem, RemoveOrderItem};
use dispatch_core::entities::status_history::ListHistoryByOrder;
use dispatch_core::entities::{NewOrderItem, OrderFilter, OrderStatus};
use dispatch_core::error::OrderError;
use dispatch_core::framework::DatabaseProcessor;
use dispatch_core::processors::{
    AssignDriver, CancelOrder, GetOrderStats, ListAvailableOrders, StatsFilter,
    TransitionOrderStatus,
};
use futures_util::future::join_all;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

async fn processor() -> DatabaseProcessor {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("db connect");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("migrations");
    DatabaseProcessor::new(pool)
}

/// Restaurant ids are randomised per test so runs do not see each other.
fn unique_restaurant() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos % 1_000_000_000).unwrap() + 1_000_000
}

fn new_order(restaurant_id: i64) -> CreateOrderWithItems {
    CreateOrderWithItems {
        customer_id: 1,
        restaurant_id,
        restaurant_name: "Trattoria".to_string(),
        delivery_address_id: None,
        special_instructions: Some("leave at the door".to_string()),
        tax_amount: dec!(1.60),
        delivery_fee: dec!(3.00),
        discount_amount: Decimal::ZERO,
        items: vec![NewOrderItem {
            name: "Margherita".to_string(),
            description: Some("tomato, mozzarella, basil".to_string()),
            unit_price: dec!(10.00),
            quantity: 2,
            customizations: serde_json::json!({ "crust": "thin" }),
            customization_surcharge: Decimal::ZERO,
        }],
    }
}

async fn advance(processor: &DatabaseProcessor, order_id: i64, targets: &[OrderStatus]) {
    for target in targets {
        processor
            .process(TransitionOrderStatus {
                order_id,
                target: *target,
                actor_id: Some(500),
                notes: None,
                estimated_preparation_minutes: Some(15),
            })
            .await
            .unwrap();
    }
}

const TO_READY: [OrderStatus; 3] = [
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_worked_example() {
    let processor = processor().await;
    let created = processor
        .process(new_order(unique_restaurant()))
        .await
        .unwrap();
    assert_eq!(created.order.total_amount, dec!(24.60));
    assert_eq!(created.items[0].line_total, dec!(20.00));

    let order_id = created.order.id;
    advance(&processor, order_id, &TO_READY).await;

    let attempts = (1..=10).map(|driver_id| {
        let processor = processor.clone();
        async move {
            processor
                .process(AssignDriver {
                    order_id,
                    driver_id,
                    driver_user_id: driver_id * 100,
                })
                .await
        }
    });
    let results = join_all(attempts).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(OrderError::AlreadyAssigned)))
            .count(),
        9
    );

    let details = processor
        .process(GetOrderDetails { order_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.order.status, OrderStatus::DriverAssigned);
    assert!(details.order.driver_id.is_some());
    assert_eq!(details.order.estimated_preparation_minutes, Some(15));
    let estimate = details.order.estimated_delivery_at.unwrap();
    assert!(estimate >= details.order.confirmed_at.unwrap() + time::Duration::minutes(45));
    assert!(details.order.ready_at.is_some());
    assert_eq!(details.history.len(), 4);
}

#[tokio::test]
#[ignore]
async fn postgres_transitions_and_cancellation() {
    let processor = processor().await;
    let order_id = processor
        .process(new_order(unique_restaurant()))
        .await
        .unwrap()
        .order
        .id;

    let err = processor
        .process(AssignDriver {
            order_id,
            driver_id: 1,
            driver_user_id: 100,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotReady(OrderStatus::Pending)));

    let err = processor
        .process(TransitionOrderStatus {
            order_id,
            target: OrderStatus::Ready,
            actor_id: Some(500),
            notes: None,
            estimated_preparation_minutes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Ready
        }
    ));

    let cancelled = processor
        .process(CancelOrder {
            order_id,
            reason: "out of dough".to_string(),
            actor_id: Some(500),
            by_customer: false,
        })
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let history = processor
        .process(ListHistoryByOrder { order_id })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].notes.as_deref(), Some("out of dough"));
}

#[tokio::test]
#[ignore]
async fn postgres_items_listing_and_stats() {
    let processor = processor().await;
    let restaurant_id = unique_restaurant();
    let created = processor.process(new_order(restaurant_id)).await.unwrap();
    let order_id = created.order.id;

    let added = processor
        .process(AddOrderItem {
            order_id,
            item: NewOrderItem {
                name: "Lemonade".to_string(),
                description: None,
                unit_price: dec!(3.50),
                quantity: 1,
                customizations: serde_json::json!({}),
                customization_surcharge: dec!(0.50),
            },
        })
        .await
        .unwrap();
    assert_eq!(added.line_total, dec!(4.00));

    let err = processor
        .process(RemoveOrderItem {
            order_id,
            item_id: i64::MAX,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ItemNotFound));

    let second = processor.process(new_order(restaurant_id)).await.unwrap();
    advance(&processor, second.order.id, &TO_READY).await;

    let page = processor
        .process(ListOrders {
            filter: OrderFilter {
                restaurant_ids: Some(vec![restaurant_id]),
                ..OrderFilter::default()
            },
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, second.order.id);
    assert_eq!(page.items[1].total_amount, dec!(28.60));

    let available = processor
        .process(ListAvailableOrders {
            limit: 200,
            offset: 0,
        })
        .await
        .unwrap();
    assert!(available.iter().any(|o| o.id == second.order.id));
    assert!(available.iter().all(|o| o.driver_id.is_none()));

    processor
        .process(DeactivateOrder {
            order_id: second.order.id,
        })
        .await
        .unwrap();
    let stats = processor
        .process(GetOrderStats {
            filter: StatsFilter {
                restaurant_ids: Some(vec![restaurant_id]),
                ..StatsFilter::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.count(OrderStatus::Pending), 1);
    assert_eq!(stats.delivered_revenue, Decimal::ZERO);
}

fn lemonade() -> NewOrderItem {
    NewOrderItem {
        name: "Lemonade".to_string(),
        description: None,
        unit_price: dec!(3.50),
        quantity: 1,
        customizations: serde_json::json!({}),
        customization_surcharge: Decimal::ZERO,
    }
}

/// Stored totals agree with the stored items.
async fn assert_totals_consistent(processor: &DatabaseProcessor, order_id: i64) {
    let details = processor
        .process(GetOrderDetails { order_id })
        .await
        .unwrap()
        .unwrap();
    let order = &details.order;
    let items_sum: Decimal = details.items.iter().map(|i| i.line_total).sum();
    assert_eq!(order.subtotal_amount, items_sum);
    assert_eq!(
        order.total_amount,
        order.subtotal_amount + order.tax_amount + order.delivery_fee - order.discount_amount
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_concurrent_confirmations_single_winner() {
    let processor = processor().await;
    let order_id = processor
        .process(new_order(unique_restaurant()))
        .await
        .unwrap()
        .order
        .id;

    let attempts = (0..8).map(|_| {
        let processor = processor.clone();
        async move {
            processor
                .process(TransitionOrderStatus {
                    order_id,
                    target: OrderStatus::Confirmed,
                    actor_id: Some(500),
                    notes: None,
                    estimated_preparation_minutes: None,
                })
                .await
        }
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(
                result,
                Err(OrderError::Conflict)
                    | Err(OrderError::InvalidTransition {
                        from: OrderStatus::Confirmed,
                        to: OrderStatus::Confirmed
                    })
            ),
            "unexpected loser outcome: {result:?}"
        );
    }

    let history = processor
        .process(ListHistoryByOrder { order_id })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to_status, OrderStatus::Confirmed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_detail_edit_conflicts_with_committed_item_edit() {
    let processor = processor().await;
    let order_id = processor
        .process(new_order(unique_restaurant()))
        .await
        .unwrap()
        .order
        .id;

    // An item edit that is mid-transaction: row locked, updated_at moved.
    let mut item_edit = processor.pool.begin().await.unwrap();
    sqlx::query(
        "UPDATE orders SET updated_at = updated_at + interval '1 second' WHERE id = $1",
    )
    .bind(order_id)
    .execute(&mut *item_edit)
    .await
    .unwrap();

    let detail_edit = tokio::spawn({
        let processor = processor.clone();
        async move {
            processor
                .process(UpdateOrderDetails {
                    order_id,
                    special_instructions: Some("ring twice".to_string()),
                    ..UpdateOrderDetails::default()
                })
                .await
        }
    });

    let mut blocked = false;
    for _ in 0..500 {
        let waiting: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pg_stat_activity WHERE pg_backend_pid() = ANY(pg_blocking_pids(pid))",
        )
        .fetch_one(&mut *item_edit)
        .await
        .unwrap();
        if waiting > 0 {
            blocked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(blocked, "detail edit never reached the row lock");
    item_edit.commit().await.unwrap();

    let err = detail_edit.await.unwrap().unwrap_err();
    assert!(matches!(err, OrderError::Conflict));
    assert_totals_consistent(&processor, order_id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_detail_edit_racing_item_add_keeps_totals() {
    let processor = processor().await;
    let order_id = processor
        .process(new_order(unique_restaurant()))
        .await
        .unwrap()
        .order
        .id;

    for round in 0..10 {
        let discount = Decimal::new(round * 10, 2);
        let (detail, added) = tokio::join!(
            processor.process(UpdateOrderDetails {
                order_id,
                discount_amount: Some(discount),
                ..UpdateOrderDetails::default()
            }),
            processor.process(AddOrderItem {
                order_id,
                item: lemonade(),
            }),
        );
        assert!(added.is_ok(), "item add failed: {added:?}");
        assert!(
            matches!(detail, Ok(_) | Err(OrderError::Conflict)),
            "unexpected detail edit outcome: {detail:?}"
        );
        assert_totals_consistent(&processor, order_id).await;
    }
}
