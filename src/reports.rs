use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::order::{Order, OrderStatus};
use crate::models::product::{Product, StockLevel};
use crate::money;

const UNCATEGORIZED: &str = "general";

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FinancialReport {
    pub total_revenue: f64,
    pub average_order_value: f64,
    /// Sorted by category name.
    pub revenue_by_category: BTreeMap<String, f64>,
    pub order_count: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct OrderStats {
    pub awaiting_shipment: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub returned: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_products: i64,
    pub active_categories: i64,
    pub total_orders: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct InventoryRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub stock_quantity: i64,
    pub level: StockLevel,
}

#[derive(Debug, Serialize, Clone)]
pub struct InventoryReport {
    pub low_stock_threshold: i64,
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub rows: Vec<InventoryRow>,
}

/// Revenue over every order still standing (not cancelled, not returned).
pub fn financial_report(orders: &[Order]) -> FinancialReport {
    let counted: Vec<&Order> = orders.iter().filter(|o| o.status.counts_as_revenue()).collect();

    let total_revenue = money::round_cents(counted.iter().map(|o| o.total).sum());
    let order_count = counted.len();
    let average_order_value = if order_count == 0 {
        0.0
    } else {
        money::round_cents(total_revenue / order_count as f64)
    };

    let mut revenue_by_category: BTreeMap<String, f64> = BTreeMap::new();
    for item in counted.iter().flat_map(|o| o.items.iter()) {
        let key = if item.category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            item.category.clone()
        };
        *revenue_by_category.entry(key).or_insert(0.0) += item.price * item.quantity as f64;
    }
    for amount in revenue_by_category.values_mut() {
        *amount = money::round_cents(*amount);
    }

    FinancialReport {
        total_revenue,
        average_order_value,
        revenue_by_category,
        order_count,
    }
}

pub fn order_stats(orders: &[Order]) -> OrderStats {
    let count = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count() as i64;
    OrderStats {
        awaiting_shipment: count(OrderStatus::Paid),
        shipped: count(OrderStatus::Shipped),
        delivered: count(OrderStatus::Delivered),
        returned: count(OrderStatus::Returned),
    }
}

pub fn inventory_report(products: &[Product], low_stock_threshold: i64) -> InventoryReport {
    let rows: Vec<InventoryRow> = products
        .iter()
        .map(|p| InventoryRow {
            id: p.id,
            name: p.name.clone(),
            category: p.category.clone(),
            stock_quantity: p.stock_quantity,
            level: StockLevel::classify(p.stock_quantity, low_stock_threshold),
        })
        .collect();

    InventoryReport {
        low_stock_threshold,
        out_of_stock: rows.iter().filter(|r| r.level == StockLevel::Out).count(),
        low_stock: rows.iter().filter(|r| r.level == StockLevel::Low).count(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderItem;
    use chrono::NaiveDateTime;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2030-01-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn order(id: &str, status: OrderStatus, items: Vec<(&str, f64, i64)>) -> Order {
        let items: Vec<OrderItem> = items
            .into_iter()
            .enumerate()
            .map(|(i, (category, price, quantity))| OrderItem {
                id: i as i64,
                order_id: id.to_string(),
                product_id: Some(i as i64),
                product_name: format!("item {}", i),
                category: category.to_string(),
                price,
                quantity,
            })
            .collect();
        Order {
            id: id.to_string(),
            customer_name: "Test".to_string(),
            customer_whatsapp: "+10000000".to_string(),
            customer_email: "t@example.com".to_string(),
            total: items.iter().map(|i| i.line_total()).sum(),
            status,
            gateway: "stripe".to_string(),
            payment_id: None,
            tracking_number: None,
            shipping_company: None,
            created_at: ts(),
            items,
        }
    }

    fn product(id: i64, stock: i64) -> Product {
        Product {
            id,
            slug: format!("p-{}", id),
            name: format!("Piece {}", id),
            price: 10.0,
            image: String::new(),
            category: "art".to_string(),
            description: String::new(),
            origin_story: None,
            rating: 5.0,
            reviews_count: 0,
            is_active: true,
            stock_quantity: stock,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn financial_report_skips_cancelled_and_returned() {
        let orders = vec![
            order("AK-00001", OrderStatus::Paid, vec![("art", 100.0, 2)]),
            order("AK-00002", OrderStatus::Delivered, vec![("clothes", 50.0, 1), ("", 25.0, 2)]),
            order("AK-00003", OrderStatus::Cancelled, vec![("art", 1000.0, 1)]),
            order("AK-00004", OrderStatus::Returned, vec![("art", 500.0, 1)]),
        ];
        let report = financial_report(&orders);
        assert_eq!(report.order_count, 2);
        assert!((report.total_revenue - 300.0).abs() < 1e-9);
        assert!((report.average_order_value - 150.0).abs() < 1e-9);
        assert_eq!(report.revenue_by_category.get("art"), Some(&200.0));
        assert_eq!(report.revenue_by_category.get("clothes"), Some(&50.0));
        assert_eq!(report.revenue_by_category.get("general"), Some(&50.0));
    }

    #[test]
    fn financial_report_empty() {
        let report = financial_report(&[]);
        assert_eq!(report.order_count, 0);
        assert_eq!(report.average_order_value, 0.0);
        assert!(report.revenue_by_category.is_empty());
    }

    #[test]
    fn order_stats_counts_each_bucket() {
        let orders = vec![
            order("AK-1", OrderStatus::Paid, vec![]),
            order("AK-2", OrderStatus::Paid, vec![]),
            order("AK-3", OrderStatus::Shipped, vec![]),
            order("AK-4", OrderStatus::Returned, vec![]),
            order("AK-5", OrderStatus::Pending, vec![]),
        ];
        let stats = order_stats(&orders);
        assert_eq!(
            stats,
            OrderStats {
                awaiting_shipment: 2,
                shipped: 1,
                delivered: 0,
                returned: 1,
            }
        );
    }

    #[test]
    fn inventory_levels() {
        let products = vec![product(1, 0), product(2, 4), product(3, 5), product(4, 40)];
        let report = inventory_report(&products, 5);
        assert_eq!(report.out_of_stock, 1);
        assert_eq!(report.low_stock, 1);
        assert_eq!(report.rows[2].level, StockLevel::InStock);
    }
}
