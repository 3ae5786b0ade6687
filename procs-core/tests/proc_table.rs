use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use procs_core::{
    api::{Empty, Null},
    get_proc_address,
    instance::RequestAdapterCallbackInfo,
    proc_table, set_proc_table,
    types::{Backend, CallbackMode, RequestAdapterStatus},
    Global, InstallProcTableError, ProcTable,
};

static_assertions::assert_impl_all!(&'static ProcTable: Send, Sync);

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Only one table can ever be installed per process, so every installation
// check lives in this one test.
#[test]
fn install_once() {
    init();

    assert_eq!(proc_table(), None);

    static PARTIAL: ProcTable = ProcTable::EMPTY;
    match set_proc_table(&PARTIAL) {
        Err(InstallProcTableError::Missing(missing)) => {
            assert_eq!(missing.names.len(), procs_core::ENTRY_POINT_COUNT)
        }
        other => panic!("expected missing entry points, got {other:?}"),
    }
    assert_eq!(proc_table(), None);

    let procs = ProcTable::new::<Null>();
    set_proc_table(procs).unwrap();
    assert_eq!(proc_table(), Some(procs));

    assert!(matches!(
        set_proc_table(ProcTable::new::<Empty>()),
        Err(InstallProcTableError::AlreadyInstalled)
    ));
    assert_eq!(proc_table(), Some(procs));
}

#[test]
fn backends_are_selected_by_name() {
    init();

    assert_eq!(ProcTable::try_from_backend("null").unwrap(), ProcTable::new::<Null>());
    assert_eq!(ProcTable::try_from_backend("empty").unwrap().backend(), Some(Backend::Empty));
    assert!(ProcTable::try_from_backend("vulkan").is_err());
}

#[test]
fn every_name_resolves_to_its_entry() {
    init();

    for entry in procs_core::ENTRY_POINTS {
        assert_eq!(get_proc_address(entry.name), Some(entry));
        assert_eq!(get_proc_address(entry.proc_name), Some(entry));
        assert_eq!(get_proc_address(&entry.symbol()), Some(entry));
    }
}

#[test]
fn empty_backend_has_no_adapters() {
    init();

    let procs = ProcTable::new::<Empty>();
    let global = Global::new();
    let instance = procs.create_instance(&global, None).unwrap();

    let status = Arc::new(Mutex::new(None));
    let slot = status.clone();

    procs
        .instance_request_adapter(
            &global,
            instance,
            None,
            RequestAdapterCallbackInfo::new(
                CallbackMode::AllowProcessEvents,
                Box::new(move |status, id, _: &str| *slot.lock() = Some((status, id))),
            ),
        )
        .unwrap();

    assert!(status.lock().is_none());
    procs.instance_process_events(&global, instance).unwrap();
    assert_eq!(*status.lock(), Some((RequestAdapterStatus::Unavailable, None)));
}

#[test]
fn interposed_slot_is_called() {
    init();

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_create_instance(
        global: &Global,
        desc: Option<&procs_core::instance::InstanceDescriptor>,
    ) -> Result<procs_core::id::InstanceId, procs_core::instance::CreateInstanceError> {
        CALLS.fetch_add(1, Ordering::SeqCst);
        global.create_instance::<Null>(desc)
    }

    let procs: &'static ProcTable = Box::leak(Box::new(ProcTable {
        create_instance: Some(counting_create_instance),
        ..ProcTable::new::<Null>().clone()
    }));

    procs.validate().unwrap();
    assert_ne!(procs, ProcTable::new::<Null>());
    assert_eq!(procs.backend(), Some(Backend::Null));

    let global = Global::new();
    let instance = procs.create_instance(&global, None).unwrap();
    procs.instance_release(&global, instance).unwrap();

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert!(global.generate_report().is_empty());
}

#[cfg(feature = "serde")]
#[test]
fn tables_serialize_as_their_backend() {
    let json = serde_json::to_string(ProcTable::new::<Null>()).unwrap();
    assert_eq!(json, "\"Null\"");

    let table: &'static ProcTable = serde_json::from_str(&json).unwrap();
    assert_eq!(table, ProcTable::new::<Null>());

    let table: &'static ProcTable = serde_json::from_str("null").unwrap();
    assert_eq!(table.backend(), None);
    assert!(table.validate().is_err());
}
