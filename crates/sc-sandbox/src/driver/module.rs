use tracing::debug;
use wasmi::{Engine, Extern, Instance, Linker, Memory, MemoryType, Module, Store, Val};

use crate::{
    constants::memory::MEMORY_EXPORT,
    from_guest_error,
    host::{register, Sandbox},
    Result, SandboxError,
};

/// A guest module instantiated against a [`Sandbox`].
///
/// The store owns the sandbox for as long as the module lives; take it back with
/// [`GuestModule::into_sandbox`] once the run is over.
#[derive(Debug)]
pub struct GuestModule {
    store: Store<Sandbox>,
    instance: Instance,
    memory: Memory,
}

impl GuestModule {
    /// Validates `wasm`, links it against the import table and a fixed-size linear memory, and
    /// runs its start function.
    ///
    /// Parse, validation and link failures are [`SandboxError::Instantiate`]. A fault raised by
    /// the start function (such as an abort in top-level code) is returned as raised.
    pub fn instantiate(engine: &Engine, wasm: &[u8], sandbox: Sandbox) -> Result<Self> {
        let module = Module::new(engine, wasm).map_err(instantiate_error)?;
        let pages = sandbox.config().memory_pages;
        let config = sandbox.config().clone();
        let mut store = Store::new(engine, sandbox);

        let ty = MemoryType::new(pages, Some(pages)).map_err(instantiate_error)?;
        let memory = Memory::new(&mut store, ty).map_err(instantiate_error)?;
        let mut linker = Linker::<Sandbox>::new(engine);
        register(&mut linker, memory, &config)?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(instantiate_error)?
            .start(&mut store)
            .map_err(from_guest_error)?;
        debug!(pages, "Instantiated guest module");
        Ok(Self { store, instance, memory })
    }

    /// Invokes the export `name`, which must take no parameters. Its results are discarded.
    pub fn call_entry(&mut self, name: &str) -> Result<()> {
        let func = self
            .instance
            .get_func(&self.store, name)
            .ok_or_else(|| SandboxError::Instantiate(format!("entry `{name}` is not exported")))?;
        let ty = func.ty(&self.store);
        if !ty.params().is_empty() {
            return Err(SandboxError::Instantiate(format!("entry `{name}` takes parameters")));
        }
        let mut results: Vec<Val> = ty.results().iter().copied().map(Val::default).collect();

        debug!(entry = name, "Calling entry");
        func.call(&mut self.store, &[], &mut results).map_err(from_guest_error)
    }

    /// Whether the module exports a function called `name`.
    pub fn has_export(&self, name: &str) -> bool {
        self.instance.get_func(&self.store, name).is_some()
    }

    /// The linear memory objects live in: the module's own export if any, the fixed memory
    /// otherwise.
    pub fn memory(&self) -> &[u8] {
        self.instance
            .get_export(&self.store, MEMORY_EXPORT)
            .and_then(Extern::into_memory)
            .unwrap_or(self.memory)
            .data(&self.store)
    }

    /// The sandbox.
    pub fn sandbox(&self) -> &Sandbox {
        self.store.data()
    }

    /// The sandbox, writable.
    pub fn sandbox_mut(&mut self) -> &mut Sandbox {
        self.store.data_mut()
    }

    /// Ends the module and returns its sandbox.
    pub fn into_sandbox(self) -> Sandbox {
        self.store.into_data()
    }
}

fn instantiate_error(err: impl std::fmt::Display) -> SandboxError {
    SandboxError::Instantiate(err.to_string())
}
