use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nodal_core::{
    Context, Error, ErrorKind, EventArgs, EventListener, ListenerHandler, Loader, ModuleBuilder,
    Node, Result, Value, events,
};
use nodal_core::testing::{self, Recorder};
use rstest::{fixture, rstest};

fn pong(_ctx: &Context, args: &EventArgs) -> Result<()> {
    args.args().set_value("pong");
    Ok(())
}

fn count_child(_ctx: &Context, args: &EventArgs) -> Result<()> {
    args.args().add_new("hit", args.name());
    Ok(())
}

#[fixture]
fn ctx() -> Context {
    testing::context()
}

#[rstest]
fn ping_returns_pong(ctx: Context) {
    ctx.bind("ping", pong);
    let result = ctx.raise("ping", Some(Node::new(""))).expect("raise");
    assert_eq!(result.value(), Value::from("pong"));
}

#[rstest]
fn binding_twice_invokes_once(ctx: Context) {
    assert!(ctx.bind("twice", count_child));
    assert!(!ctx.bind("twice", count_child));
    let result = ctx.raise("twice", None).expect("raise");
    assert_eq!(result.count(), 1);
}

#[rstest]
fn unbound_events_return_the_argument(ctx: Context) {
    let args = Node::with_value("payload", 5);
    let result = ctx.raise("nobody-listens", Some(args.clone())).expect("raise");
    assert_eq!(result, args);
    assert_eq!(result.value(), Value::Int(5));
}

struct Counter {
    hits: AtomicUsize,
}

impl Counter {
    fn on_tick(&self, _ctx: &Context, _args: &EventArgs) -> Result<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_reset(&self, _ctx: &Context, args: &EventArgs) -> Result<()> {
        args.args().set_value(i64::try_from(self.hits.swap(0, Ordering::SeqCst)).unwrap_or(-1));
        Ok(())
    }
}

impl EventListener for Counter {
    fn handlers() -> &'static [ListenerHandler<Self>] {
        const HANDLERS: &[ListenerHandler<Counter>] = &[
            ListenerHandler { events: &["tick", "tock"], handler: Counter::on_tick },
            ListenerHandler { events: &["reset"], handler: Counter::on_reset },
        ];
        HANDLERS
    }
}

#[rstest]
fn listener_methods_are_bound_to_the_instance(ctx: Context) {
    let counter = Arc::new(Counter { hits: AtomicUsize::new(0) });
    let id = ctx.register_listener(Arc::clone(&counter)).expect("register");

    ctx.raise("tick", None).expect("tick");
    ctx.raise("tock", None).expect("tock");
    assert_eq!(counter.hits.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.raise("reset", None).expect("reset").value(), Value::Int(2));

    assert_eq!(ctx.unregister_listener(id), 3);
    ctx.raise("tick", None).expect("tick");
    assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
    assert!(ctx.events().is_empty());
}

#[rstest]
fn two_instances_bind_separately(ctx: Context) {
    let first = Arc::new(Counter { hits: AtomicUsize::new(0) });
    let second = Arc::new(Counter { hits: AtomicUsize::new(0) });
    ctx.register_listener(Arc::clone(&first)).expect("first");
    let second_id = ctx.register_listener(Arc::clone(&second)).expect("second");

    ctx.raise("tick", None).expect("tick");
    assert_eq!(ctx.unbind_instance("tick", second_id), 1);
    ctx.raise("tick", None).expect("tick");
    assert_eq!(first.hits.load(Ordering::SeqCst), 2);
    assert_eq!(second.hits.load(Ordering::SeqCst), 1);
}

#[rstest]
fn bind_instance_is_idempotent(ctx: Context) {
    let counter = Arc::new(Counter { hits: AtomicUsize::new(0) });
    assert!(ctx.bind_instance("tick", &counter, Counter::on_tick));
    assert!(!ctx.bind_instance("tick", &counter, Counter::on_tick));
    ctx.raise("tick", None).expect("tick");
    assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
}

#[rstest]
fn catch_all_listener_sees_every_event(ctx: Context) {
    ctx.bind("ping", pong);
    let recorder = Recorder::new();
    let id = ctx.register_listener(Arc::clone(&recorder)).expect("register");
    ctx.raise("ping", None).expect("ping");
    ctx.raise("nobody.listens", None).expect("unbound");
    assert_eq!(recorder.seen(), ["ping", "nobody.listens"]);

    assert_eq!(ctx.unregister_listener(id), 1);
    ctx.raise("ping", None).expect("ping");
    assert_eq!(recorder.seen().len(), 2);
}

#[rstest]
fn modules_passed_to_a_fresh_loader_are_bound() {
    let ctx = testing::context_with(vec![ModuleBuilder::new("pong").handler("ping", pong).build()], None);
    assert_eq!(ctx.raise("ping", None).expect("ping").value(), Value::from("pong"));
}

static INITIALIZED: AtomicUsize = AtomicUsize::new(0);

fn on_initialized(_ctx: &Context, _args: &EventArgs) -> Result<()> {
    INITIALIZED.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[rstest]
fn context_creation_raises_initialized() {
    let loader = Loader::new();
    loader
        .register(
            ModuleBuilder::new("lifecycle")
                .handler(events::CONTEXT_INITIALIZED, on_initialized)
                .build(),
        )
        .expect("register");
    let before = INITIALIZED.load(Ordering::SeqCst);
    loader.create_context(None).expect("context");
    assert_eq!(INITIALIZED.load(Ordering::SeqCst), before + 1);
}

#[rstest]
fn failing_initialization_fails_creation() {
    fn refuse(_ctx: &Context, _args: &EventArgs) -> Result<()> {
        Err(Error::handler("not today"))
    }
    let loader = Loader::new();
    loader
        .register(ModuleBuilder::new("refuse").handler(events::CONTEXT_INITIALIZED, refuse).build())
        .expect("register");
    let error = loader.create_context(None).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Handler);
    assert_eq!(error.to_string(), "not today");
}

#[rstest]
fn static_handlers_are_shared_by_contexts() {
    let loader = Loader::new();
    loader
        .register(ModuleBuilder::new("ping").handler_for(["ping", "ping2"], pong).build())
        .expect("register");
    let first = loader.create_context(None).expect("first");
    let second = loader.create_context(None).expect("second");
    first.bind("only-first", pong);

    assert_eq!(second.raise("ping2", None).expect("raise").value(), Value::from("pong"));
    assert!(!second.has_event("only-first"));
    assert_eq!(first.events(), ["only-first", "ping", "ping2"]);
}

#[rstest]
fn contexts_raise_concurrently() {
    let loader = Loader::new();
    loader.register(ModuleBuilder::new("ping").handler("ping", pong).build()).expect("register");
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = loader.create_context(None).expect("context");
            std::thread::spawn(move || ctx.raise("ping", None).map(|node| node.value()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("join").expect("raise"), Value::from("pong"));
    }
}

fn linked(_ctx: &Context, args: &EventArgs) -> Result<()> {
    args.args().set_value("linked");
    Ok(())
}

nodal_core::register_event_handler!(["test.linked"], linked);

#[rstest]
fn link_time_handlers_are_discovered() {
    let ctx = Loader::discover().create_context(None).expect("context");
    assert_eq!(ctx.raise("test.linked", None).expect("raise").value(), Value::from("linked"));
}

#[rstest]
fn load_collects_handlers_below_a_path() {
    let loader = Loader::new();
    loader.load(module_path!(), "linked").expect("load");
    assert_eq!(loader.modules(), ["linked"]);
    assert!(loader.events().contains(&"test.linked".to_string()));
    let ctx = loader.create_context(None).expect("context");
    assert!(ctx.has_event("test.linked"));
}
