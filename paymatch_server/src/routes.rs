//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Database access and webhook delivery are always awaited (or handed
//! off to the event handlers), never blocked on.
//!
//! Merchant routes are generic over the storage backend. Web-actix cannot handle generics in handlers, so they are
//! registered with the [`route!`] macro, e.g. `CreateOrderRoute::<SqliteDatabase>::new()`.
use actix_web::{error::JsonPayloadError, get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use paymatch_engine::{
    db_types::{Cents, OrderNumber},
    ApiKeyApi,
    OrderFlowApi,
    OrderFlowError,
    PaymatchDatabase,
};

use crate::{
    config::RouteOptions,
    data_objects::{ApiResponse, CheckOrderRequest, CreateOrderRequest, CreatedOrder, NotifyOutcome, NotifyRequest},
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Maps JSON body errors onto the `PARAMS_ERROR` envelope instead of actix's plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req| {
        debug!("💻️ Could not read request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/order/create" impl PaymatchDatabase);
/// Creates a pending order for the merchant identified by `ak`.
///
/// The stored price may be higher than the requested one if other pending orders already hold it, so merchants must
/// present the returned `price` to the payer.
pub async fn create_order<B: PaymatchDatabase>(
    body: web::Json<CreateOrderRequest>,
    orders: web::Data<OrderFlowApi<B>>,
    keys: web::Data<ApiKeyApi<B>>,
    options: web::Data<RouteOptions>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    trace!("💻️ Received create order request from {}", request.ak);
    let merchant = keys.authorize_api_call(&request.ak, &request).await?;
    let price = Cents::try_from(request.price).map_err(|e| ServerError::InvalidPrice(e.to_string()))?;
    let order = orders.create_order(&merchant, price, request.payment_method, &request.notify_url).await?;
    debug!("💻️ Order {} created for {} at {}", order.order_number, merchant.name, order.price);
    let pay_url = options.pay_url(order.order_number.as_str());
    Ok(HttpResponse::Ok().json(ApiResponse::success(CreatedOrder { order, pay_url })))
}

route!(check_order => Get "/order/check" impl PaymatchDatabase);
/// Fetches one of the merchant's orders. The parameters are read from the query string, or from a JSON body if the
/// query string is empty.
///
/// Orders belonging to another merchant are reported as not found.
pub async fn check_order<B: PaymatchDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    orders: web::Data<OrderFlowApi<B>>,
    keys: web::Data<ApiKeyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = read_check_request(&req, &body)?;
    trace!("💻️ Received order check request for {} from {}", request.order_number, request.ak);
    let merchant = keys.authorize_api_call(&request.ak, &request).await?;
    let order = orders.order_status(&OrderNumber::from(request.order_number)).await?;
    if order.api_key_id != merchant.id {
        warn!("💻️ {} asked for order {}, which belongs to another merchant", merchant.name, order.order_number);
        return Err(ServerError::OrderNotFound);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

fn read_check_request(req: &HttpRequest, body: &[u8]) -> Result<CheckOrderRequest, ServerError> {
    if !req.query_string().is_empty() {
        return web::Query::<CheckOrderRequest>::from_query(req.query_string())
            .map(web::Query::into_inner)
            .map_err(|e| ServerError::InvalidRequestBody(e.to_string()));
    }
    if body.is_empty() {
        return Err(ServerError::InvalidRequestBody("ak, sign and order_number are required".into()));
    }
    serde_json::from_slice(body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))
}

//----------------------------------------------   Notify  ----------------------------------------------------
route!(notify => Post "/order/notify" impl PaymatchDatabase);
/// Receives a payment notification forwarded from a payer-side device.
///
/// Once the callback signature checks out, the reply is one of the plain JSON strings in [`NotifyOutcome`], not the
/// usual envelope. The merchant webhook is queued and never delays the reply.
pub async fn notify<B: PaymatchDatabase>(
    req: HttpRequest,
    body: web::Json<NotifyRequest>,
    orders: web::Data<OrderFlowApi<B>>,
    keys: web::Data<ApiKeyApi<B>>,
    options: web::Data<RouteOptions>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for).map(|ip| ip.to_string()).unwrap_or_default();
    info!("💻️ Payment notification from {} ({peer}): {}", request.ak, request.msg);
    keys.authorize_callback(&request.ak, &request.timestamp, &request.sign).await?;
    let outcome = match orders.process_notification(&request.msg).await {
        Ok(order) => {
            info!("💻️ Order {} paid with {}", order.order_number, order.price);
            NotifyOutcome::Paid
        },
        Err(OrderFlowError::NoMatch | OrderFlowError::AmountUnparseable(_)) => {
            debug!("💻️ Notification ignored. It does not report a credited amount");
            NotifyOutcome::Ignored
        },
        Err(e @ (OrderFlowError::NoMatchingOrder(_) | OrderFlowError::AlreadyPaid(_))) => {
            info!("💻️ Notification did not pay any order. {e}");
            NotifyOutcome::OrderNotFound
        },
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok().json(outcome.as_str()))
}
