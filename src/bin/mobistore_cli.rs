use std::{collections::BTreeMap, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use mobistore_api::{
    auth::{AuthConfig, AuthService, ADMIN_ROLE},
    cart::{self, Cart, VariantSelection},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{product, OrderStatus},
    events::EventSender,
    local_store::FileStore,
    pricing::format_dinars,
    services::{
        catalog::{ProductQuery, ProductSort},
        orders::{OrderFilter, OrderWithItems, PlaceOrderInput},
        CategoryService, DashboardService, DeliveryService, OrderService, ProductCatalogService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(cli.state_dir.clone()).await?;

    match cli.command {
        Commands::Products(command) => handle_products_command(&context, command, cli.json).await?,
        Commands::Categories => handle_categories(&context, cli.json).await?,
        Commands::Cart(command) => handle_cart_command(&context, command, cli.json).await?,
        Commands::Favorites(command) => {
            handle_favorites_command(&context, command, cli.json).await?
        }
        Commands::Checkout(args) => handle_checkout(&context, args, cli.json).await?,
        Commands::Admin(command) => handle_admin_command(&context, command, cli.json).await?,
        Commands::Seed => handle_seed(&context).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "mobistore", about = "Mobistore Plus storefront and back-office CLI", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        help = "Directory holding the local cart and favorites (default ~/.mobistore)"
    )]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Products(ProductsCommands),
    /// List categories
    Categories,
    #[command(subcommand)]
    Cart(CartCommands),
    #[command(subcommand)]
    Favorites(FavoritesCommands),
    /// Place an order from the local cart
    Checkout(CheckoutArgs),
    #[command(subcommand)]
    Admin(AdminCommands),
    /// Insert the default categories when none exist
    Seed,
}

#[derive(Subcommand)]
enum ProductsCommands {
    List(ListProductsArgs),
    Show { id: Uuid },
    Search { term: String },
    Featured,
    Related { id: Uuid },
}

#[derive(Args)]
struct ListProductsArgs {
    #[arg(long, help = "Category slug, or `all`")]
    category: Option<String>,
    #[arg(long, default_value = "newest", help = "newest, price-asc, price-desc or name")]
    sort: String,
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Subcommand)]
enum CartCommands {
    Show,
    Add {
        product_id: Uuid,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long = "variant", help = "Variant id; repeat for several option groups")]
        variants: Vec<Uuid>,
    },
    Set {
        product_id: Uuid,
        quantity: u32,
    },
    Remove {
        product_id: Uuid,
    },
    Clear,
}

#[derive(Subcommand)]
enum FavoritesCommands {
    List,
    Toggle { product_id: Uuid },
    Remove { product_id: Uuid },
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    address: String,
    #[arg(long, help = "Wilaya name or code")]
    wilaya: String,
}

#[derive(Subcommand)]
enum AdminCommands {
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = ADMIN_ROLE)]
        role: String,
    },
    Orders {
        #[arg(long, help = "pending, confirmed, shipped, delivered or cancelled")]
        status: Option<String>,
    },
    SetStatus {
        order_id: Uuid,
        status: String,
    },
    SetDelivery {
        wilaya: String,
        price: Decimal,
    },
    Stats,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    auth_service: Arc<AuthService>,
    state_dir: PathBuf,
}

impl CliContext {
    async fn initialize(state_dir: Option<PathBuf>) -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }
        let db = Arc::new(db_pool);

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));

        let (event_sender, mut event_rx) = EventSender::channel(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "mobistore_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db,
            event_sender: Arc::new(event_sender),
            auth_service,
            state_dir: state_dir.unwrap_or_else(default_state_dir),
        })
    }

    fn product_service(&self) -> ProductCatalogService {
        ProductCatalogService::new(self.db.clone(), self.event_sender.clone())
    }

    fn order_service(&self) -> OrderService {
        OrderService::new(self.db.clone(), self.event_sender.clone())
    }

    fn delivery_service(&self) -> DeliveryService {
        DeliveryService::new(self.db.clone(), self.event_sender.clone())
    }

    fn store(&self) -> Result<FileStore> {
        FileStore::open(&self.state_dir)
            .with_context(|| format!("failed to open state dir {}", self.state_dir.display()))
    }
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mobistore")
}

async fn handle_products_command(
    context: &CliContext,
    command: ProductsCommands,
    json: bool,
) -> Result<()> {
    let service = context.product_service();
    match command {
        ProductsCommands::List(args) => {
            let query = ProductQuery {
                category: args.category,
                sort: ProductSort::from_str(&args.sort).map_err(|e| anyhow!(e.to_string()))?,
                limit: args.limit,
            };
            let products = service.list_products(&query).await?;
            render_products(&products, json)
        }
        ProductsCommands::Show { id } => {
            let detail = service.product_detail(id).await?;
            if json {
                return print_json(&detail);
            }
            render_product(&detail.product);
            if let Some(label) = &detail.stock_label {
                println!("  {}", label);
            }
            for group in &detail.variants {
                let values: Vec<&str> = group.options.iter().map(|v| v.value.as_str()).collect();
                println!("  {}: {}", group.name, values.join(" / "));
            }
            for image in &detail.images {
                println!("  image {}", image);
            }
            Ok(())
        }
        ProductsCommands::Search { term } => {
            let products = service.search(&term, context.config.search_limit).await?;
            render_products(&products, json)
        }
        ProductsCommands::Featured => {
            let products = service
                .featured_products(context.config.featured_limit)
                .await?;
            render_products(&products, json)
        }
        ProductsCommands::Related { id } => {
            let products = service
                .related_products(id, context.config.related_limit)
                .await?;
            render_products(&products, json)
        }
    }
}

async fn handle_categories(context: &CliContext, json: bool) -> Result<()> {
    let categories = CategoryService::new(context.db.clone())
        .list_categories()
        .await?;
    if json {
        return print_json(&categories);
    }
    for category in categories {
        println!("- {} ({})", category.name, category.slug);
    }
    Ok(())
}

async fn handle_seed(context: &CliContext) -> Result<()> {
    let inserted = CategoryService::new(context.db.clone())
        .seed_defaults()
        .await?;
    if inserted == 0 {
        println!("Categories already present; nothing to seed");
    } else {
        println!("Seeded {} categories", inserted);
    }
    Ok(())
}

async fn handle_cart_command(context: &CliContext, command: CartCommands, json: bool) -> Result<()> {
    let mut cart = cart::load_cart(context.store()?);

    match command {
        CartCommands::Show => {}
        CartCommands::Add {
            product_id,
            quantity,
            variants,
        } => {
            let service = context.product_service();
            let product = service.get_product(product_id).await?;
            if !product.is_in_stock() {
                return Err(anyhow!("{} is out of stock", product.name));
            }

            let selection = if variants.is_empty() {
                None
            } else {
                let available = service.product_variants(product_id).await?;
                let mut selection = VariantSelection::default();
                for id in variants {
                    let variant = available
                        .iter()
                        .find(|v| v.id == id)
                        .cloned()
                        .ok_or_else(|| anyhow!("variant {} does not belong to {}", id, product.name))?;
                    selection.select(variant);
                }
                Some(selection)
            };

            let name = product.name.clone();
            let total = cart.update(|c| c.add_configured(product, selection, quantity))?;
            println!("{} x {} in cart", total, name);
        }
        CartCommands::Set {
            product_id,
            quantity,
        } => {
            let updated = cart.update(|c| c.update_quantity(product_id, quantity))?;
            if updated.is_none() {
                return Err(anyhow!("product {} is not in the cart", product_id));
            }
        }
        CartCommands::Remove { product_id } => {
            if !cart.update(|c| c.remove(product_id))? {
                return Err(anyhow!("product {} is not in the cart", product_id));
            }
        }
        CartCommands::Clear => cart.update(Cart::clear)?,
    }

    render_cart(cart.get(), json)
}

async fn handle_favorites_command(
    context: &CliContext,
    command: FavoritesCommands,
    json: bool,
) -> Result<()> {
    let mut favorites = cart::load_favorites(context.store()?);

    match command {
        FavoritesCommands::List => {}
        FavoritesCommands::Toggle { product_id } => {
            let product = context.product_service().get_product(product_id).await?;
            let name = product.name.clone();
            let now_favorite = favorites.update(|f| f.toggle(product))?;
            if now_favorite {
                println!("Added {} to favorites", name);
            } else {
                println!("Removed {} from favorites", name);
            }
        }
        FavoritesCommands::Remove { product_id } => {
            if !favorites.update(|f| f.remove(product_id))? {
                return Err(anyhow!("product {} is not a favorite", product_id));
            }
        }
    }

    render_products(favorites.get().items(), json)
}

async fn handle_checkout(context: &CliContext, args: CheckoutArgs, json: bool) -> Result<()> {
    let mut cart = cart::load_cart(context.store()?);
    if cart.get().is_empty() {
        return Err(anyhow!("the cart is empty"));
    }

    let input = PlaceOrderInput {
        customer_name: args.name,
        customer_phone: args.phone,
        customer_address: args.address,
        wilaya: args.wilaya,
        items: cart.get().checkout_lines(),
    };

    let placed = context
        .order_service()
        .place_order(input)
        .await
        .context("failed to place order")?;
    cart.update(Cart::clear)?;

    if json {
        return print_json(&placed);
    }
    println!("Commande confirmée !");
    render_order(&placed);
    Ok(())
}

async fn handle_admin_command(
    context: &CliContext,
    command: AdminCommands,
    json: bool,
) -> Result<()> {
    match command {
        AdminCommands::CreateUser {
            email,
            password,
            role,
        } => {
            let user = context
                .auth_service
                .create_user(&email, &password, &role)
                .await?;
            if json {
                return print_json(&user);
            }
            println!("Created {} account {} ({})", user.role, user.email, user.id);
        }
        AdminCommands::Orders { status } => {
            let status = status
                .as_deref()
                .map(OrderStatus::from_str)
                .transpose()
                .map_err(|_| anyhow!("unknown order status"))?;
            let orders = context
                .order_service()
                .list_orders(OrderFilter { status })
                .await?;
            if json {
                return print_json(&orders);
            }
            if orders.is_empty() {
                println!("No orders");
            }
            orders.iter().for_each(render_order);
        }
        AdminCommands::SetStatus { order_id, status } => {
            let status = OrderStatus::from_str(&status)
                .map_err(|_| anyhow!("unknown order status '{}'", status))?;
            let order = context
                .order_service()
                .update_status(order_id, status)
                .await?;
            if json {
                return print_json(&order);
            }
            println!("Order {} is now {}", order.id, order.status.label_fr());
        }
        AdminCommands::SetDelivery { wilaya, price } => {
            let mut prices = BTreeMap::new();
            prices.insert(wilaya, price);
            let saved = context.delivery_service().save_prices(&prices).await?;
            if json {
                return print_json(&saved);
            }
            for setting in saved {
                println!("{}: {}", setting.wilaya, format_dinars(setting.price));
            }
        }
        AdminCommands::Stats => {
            let stats = DashboardService::new(context.db.clone()).stats().await?;
            if json {
                return print_json(&stats);
            }
            println!("Produits        {}", stats.total_products);
            println!("En stock        {}", stats.in_stock);
            println!("Rupture         {}", stats.out_of_stock);
            println!("Catégories      {}", stats.categories);
            println!("Commandes       {}", stats.total_orders);
            println!("En attente      {}", stats.pending_orders);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_products(products: &[product::Model], json: bool) -> Result<()> {
    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("Aucun produit trouvé");
    }
    products.iter().for_each(render_product);
    Ok(())
}

fn render_product(product: &product::Model) {
    println!(
        "- {} • {} • {} • stock {} • {}",
        product.id,
        product.name,
        format_dinars(product.price),
        product.stock,
        product.category
    );
}

fn render_cart(cart: &Cart, json: bool) -> Result<()> {
    if json {
        return print_json(cart);
    }
    if cart.is_empty() {
        println!("Votre panier est vide");
        return Ok(());
    }
    for item in cart.items() {
        let variant = item
            .variants
            .label()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default();
        println!(
            "- {} x {}{} @ {} = {}",
            item.quantity,
            item.product.name,
            variant,
            format_dinars(item.unit_price()),
            format_dinars(item.line_total())
        );
    }
    println!(
        "{} article(s) • sous-total {}",
        cart.item_count(),
        format_dinars(cart.subtotal())
    );
    Ok(())
}

fn render_order(order: &OrderWithItems) {
    println!(
        "- Order {} • {} • {} ({}) • {} • total {}",
        order.order.id,
        order.order.customer_name,
        order.order.wilaya,
        order.order.customer_phone,
        order.status_label,
        format_dinars(order.order.total)
    );
    for view in &order.items {
        let name = view
            .product
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("produit supprimé");
        let variant = view
            .item
            .variant_label
            .as_deref()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default();
        println!(
            "  • {} x {}{} @ {}",
            view.item.quantity,
            name,
            variant,
            format_dinars(view.item.price)
        );
    }
    println!(
        "  sous-total {} • livraison {}",
        format_dinars(order.order.subtotal),
        format_dinars(order.order.delivery_fee)
    );
}
