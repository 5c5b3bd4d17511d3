use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub type DbPool = Pool<SqliteConnectionManager>;

pub const DB_PATH: &str = "website/db/maison.db";

pub fn init_pool_at(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;"));
    let pool = Pool::builder().max_size(10).build(manager)?;

    // WAL for concurrent storefront reads while the admin writes
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Settings (key-value)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        -- Categories (products reference them by name)
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Catalog
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            slug TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0,
            image TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            origin_story TEXT,
            rating REAL NOT NULL DEFAULT 0,
            reviews_count INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            stock_quantity INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY,
            product_id INTEGER NOT NULL,
            user_name TEXT NOT NULL,
            rating INTEGER NOT NULL,
            comment TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
        );

        -- Guest carts, keyed by the cart cookie token
        CREATE TABLE IF NOT EXISTS carts (
            token TEXT PRIMARY KEY,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS cart_items (
            cart_token TEXT NOT NULL,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            added_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(cart_token, product_id),
            FOREIGN KEY (cart_token) REFERENCES carts(token) ON DELETE CASCADE,
            FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
        );

        -- Orders
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            customer_name TEXT NOT NULL,
            customer_whatsapp TEXT NOT NULL,
            customer_email TEXT NOT NULL,
            total REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            gateway TEXT NOT NULL DEFAULT 'stripe',
            payment_id TEXT,
            tracking_number TEXT,
            shipping_company TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
        CREATE INDEX IF NOT EXISTS idx_orders_email ON orders(customer_email);

        CREATE TABLE IF NOT EXISTS order_items (
            id INTEGER PRIMARY KEY,
            order_id TEXT NOT NULL,
            product_id INTEGER,
            product_name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL,
            quantity INTEGER NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE,
            FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE SET NULL
        );

        -- Admin sessions
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at DATETIME NOT NULL,
            expires_at DATETIME NOT NULL,
            ip_hash TEXT,
            user_agent TEXT
        );
        ",
    )?;

    Ok(())
}

const DEFAULT_CATEGORIES: &[&str] = &["clothes", "treasury", "electronics", "art"];

struct SeedProduct {
    name: &'static str,
    price: f64,
    image: &'static str,
    category: &'static str,
    description: &'static str,
    rating: f64,
    stock: i64,
}

const DEMO_CATALOG: &[SeedProduct] = &[
    SeedProduct {
        name: "Neural Sound System - Private Edition",
        price: 499.0,
        image: "https://images.unsplash.com/photo-1546435770-a3e426bf472b?q=80&w=800",
        category: "electronics",
        description: "A sound system that adapts to the listener for a fully personal listening experience.",
        rating: 5.0,
        stock: 15,
    },
    SeedProduct {
        name: "Starweave Robe",
        price: 2500.0,
        image: "https://images.unsplash.com/photo-1539109136881-3be0610cac48?q=80&w=800",
        category: "clothes",
        description: "A one-of-a-kind robe of treated natural silk that reflects light like the Milky Way.",
        rating: 5.0,
        stock: 3,
    },
    SeedProduct {
        name: "Digital Time 2050 Watch",
        price: 1200.0,
        image: "https://images.unsplash.com/photo-1523275335684-37898b6baf30?q=80&w=800",
        category: "treasury",
        description: "A luxury watch with a holographic display for the time and vital signs.",
        rating: 4.8,
        stock: 8,
    },
    SeedProduct {
        name: "Essence Crystal Sculpture",
        price: 5800.0,
        image: "https://images.unsplash.com/photo-1582555172866-f73bb12a2ab3?q=80&w=800",
        category: "art",
        description: "A handmade piece of raw crystal where nature meets future technology.",
        rating: 5.0,
        stock: 1,
    },
];

pub fn seed_defaults(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let defaults = vec![
        // Brand
        ("brand_name", "Maison 2030"),
        ("brand_logo", ""),
        ("brand_favicon", ""),
        ("brand_hero", ""),
        ("site_url", "http://localhost:8000"),
        ("admin_slug", "admin"),
        // Commerce
        ("commerce_currency", "USD"),
        ("commerce_currency_symbol", "$"),
        ("commerce_default_gateway", "stripe"),
        ("shipping_company", "Royal Aramex"),
        ("inventory_low_stock_threshold", "5"),
        ("cart_max_age_days", "30"),
        // Security
        ("session_expiry_hours", "24"),
        ("login_rate_limit", "5"),
        ("concierge_rate_limit", "20"),
        // Branding uploads
        ("branding_max_upload_kb", "2048"),
        ("branding_allowed_types", "jpeg,jpg,png,gif,svg,ico,webp"),
        // AI
        ("ai_gemini_api_key", ""),
        ("ai_gemini_text_model", "gemini-3-flash-preview"),
        ("ai_gemini_image_model", "gemini-2.5-flash-image"),
        ("ai_timeout_secs", "120"),
        // Background tasks (minutes)
        ("task_session_cleanup_interval", "30"),
        ("task_cart_cleanup_interval", "360"),
    ];

    for (key, value) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }

    let category_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if category_count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, is_active) VALUES (?1, 1)",
                params![name],
            )?;
        }
    }

    // Demo catalog goes in once; deleting the demo pieces must not bring them back
    let catalog_seeded: i64 = conn.query_row(
        "SELECT COUNT(*) FROM settings WHERE key = 'catalog_seeded'",
        [],
        |row| row.get(0),
    )?;
    if catalog_seeded == 0 {
        for p in DEMO_CATALOG {
            conn.execute(
                "INSERT INTO products (slug, name, price, image, category, description, rating, is_active, stock_quantity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
                params![
                    slug::slugify(p.name),
                    p.name,
                    p.price,
                    p.image,
                    p.category,
                    p.description,
                    p.rating,
                    p.stock
                ],
            )?;
        }
        conn.execute(
            "INSERT INTO settings (key, value) VALUES ('catalog_seeded', 'true')",
            [],
        )?;
    }

    // Seed the admin gate password if not set
    let admin_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM settings WHERE key = 'admin_password_hash'",
        [],
        |row| row.get(0),
    )?;

    if admin_exists == 0 {
        // Default gate code is "2030"
        let hash = bcrypt::hash("2030", bcrypt::DEFAULT_COST)?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES ('admin_password_hash', ?1)",
            params![hash],
        )?;
    }

    Ok(())
}
