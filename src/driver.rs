//! Invocation driver: wires registers, memory, and an implication pair to the
//! host-call dispatcher. The opcode interpreter that would normally drive an
//! instruction loop around this is out of scope here (see crate docs); a caller
//! suspends at each host-trap and invokes [`Driver::dispatch`] directly with the
//! trapped function id.

use std::collections::HashMap;

use crate::codec::{
    AccountEntry, CompleteServiceAccount, DeferredTransfer, Implications, ImplicationsPair,
    PartialState, ProvisionEntry,
};
use crate::config::{
    FetchSystemConstantsConfig, DEFAULT_GAS_LIMIT, REG_WHAT, RESULT_CODE_FAULT, RESULT_CODE_HALT,
    RESULT_CODE_OOG, RESULT_CODE_PANIC,
};
use crate::host_functions::base::HostFunctionContext;
use crate::host_functions::get_host_function;
use crate::host_functions::refine::RefineContext;
use crate::types::{Ram, RegisterState};

/// Base gas cost charged before every dispatched host call, uniformly (including `log`;
/// see SPEC_FULL.md §5 for why this crate keeps the uniform-10 behaviour).
pub const HOST_BASE_GAS: u64 = 10;

/// Outcome of one host-trap dispatch, translated from the handler's out-of-band status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Halt,
    Panic,
    Fault,
    Oog,
}

/// Accumulate-phase state owned by the driver for the lifetime of one invocation.
/// Mirrors an `Implications`, but keeps accounts in a map for O(1) lookup by id;
/// converted to/from the wire `Vec<AccountEntry>` form only at the codec boundary.
#[derive(Default, Clone)]
pub struct AccumulationContext {
    pub service_id: u64,
    pub accounts: HashMap<u64, CompleteServiceAccount>,
    pub state: PartialState,
    pub nextfreeid: u32,
    pub yield_hash: Option<Vec<u8>>,
    pub provisions: Vec<ProvisionEntry>,
    pub xfers: Vec<DeferredTransfer>,
    pub checkpoint_requested: bool,
}

impl AccumulationContext {
    pub fn from_implications(regular: &Implications) -> Self {
        let accounts = regular
            .state
            .accounts
            .iter()
            .map(|e| (e.service_id as u64, e.account.clone()))
            .collect();
        Self {
            service_id: regular.id as u64,
            accounts,
            state: regular.state.clone(),
            nextfreeid: regular.nextfreeid,
            yield_hash: regular.yield_hash.clone(),
            provisions: regular.provisions.clone(),
            xfers: Vec::new(),
            checkpoint_requested: false,
        }
    }

    /// Rebuild an `Implications` snapshot from the current driver-owned state. Used both
    /// to produce the final post-invocation regular implication and, on `checkpoint`, to
    /// seed the exceptional snapshot (Gray Paper: imY' = imX).
    pub fn to_implications(&self) -> Implications {
        let mut accounts_vec: Vec<AccountEntry> = self
            .accounts
            .iter()
            .map(|(id, account)| AccountEntry {
                service_id: *id as u32,
                account: account.clone(),
            })
            .collect();
        accounts_vec.sort_by_key(|e| e.service_id);
        let mut state = self.state.clone();
        state.accounts = accounts_vec;
        Implications {
            id: self.service_id as u32,
            state,
            nextfreeid: self.nextfreeid,
            xfers: self.xfers.clone(),
            yield_hash: self.yield_hash.clone(),
            provisions: self.provisions.clone(),
        }
    }
}

/// Pre-encoded FETCH data sources (selectors 1-15). Populated by the caller from the
/// enclosing work package / work item before the invocation begins; `None` entries make
/// the corresponding selector report `NONE`.
#[derive(Default, Clone)]
pub struct FetchSources {
    pub entropy_accumulator: Option<Vec<u8>>,
    pub authorizer_trace: Option<Vec<u8>>,
    pub export_segments: Option<Vec<Vec<Vec<u8>>>>,
    pub import_segments: Option<Vec<Vec<Vec<u8>>>>,
    pub work_item_index: Option<u64>,
    pub accumulate_inputs: Option<Vec<Vec<u8>>>,
    pub work_package_encoded: Option<Vec<u8>>,
    pub auth_config: Option<Vec<u8>>,
    pub auth_token: Option<Vec<u8>>,
    pub refine_context_encoded: Option<Vec<u8>>,
    pub work_item_summaries: Option<Vec<Vec<u8>>>,
    pub work_item_payloads: Option<Vec<Vec<u8>>>,
    pub system_constants_config: Option<FetchSystemConstantsConfig>,
}

/// Drives one invocation's worth of host-trap dispatches.
///
/// `accumulation` is `Some` exactly for accumulate-phase invocations, which unlocks
/// host ids 14-26 plus the manager/delegator/registrar-gated general calls; `refine` is
/// `Some` exactly when a machine registry (refine phase) is available, which unlocks
/// `machine`/`peek`/`poke`/`pages`/`invoke`/`expunge`/`export`.
pub struct Driver<'a> {
    pub registers: RegisterState,
    pub ram: &'a mut dyn Ram,
    pub gas_left: u64,
    pub timeslot: u64,
    pub expunge_period: u64,
    pub num_cores: u32,
    pub num_validators: u32,
    pub accumulation: Option<AccumulationContext>,
    pub refine: Option<&'a mut dyn RefineContext>,
    pub fetch: FetchSources,
    pub log_messages: Vec<String>,
}

impl<'a> Driver<'a> {
    pub fn new(ram: &'a mut dyn Ram) -> Self {
        Self {
            registers: [0u64; 13],
            ram,
            gas_left: DEFAULT_GAS_LIMIT,
            timeslot: 0,
            expunge_period: 0,
            num_cores: 0,
            num_validators: 0,
            accumulation: None,
            refine: None,
            fetch: FetchSources::default(),
            log_messages: Vec::new(),
        }
    }

    /// Dispatches the host call identified by `function_id`. Charges the uniform base
    /// cost first; an invocation that cannot afford it never enters the handler and the
    /// call terminates with `Oog`. On `Panic`/`Oog` inside an accumulate invocation that
    /// has already taken a `checkpoint`, the regular implication is atomically replaced
    /// by the exceptional snapshot — the caller is responsible for having captured that
    /// snapshot (via `checkpoint_exceptional`) beforehand.
    pub fn dispatch(&mut self, function_id: u32) -> DispatchOutcome {
        let id = function_id as u64;
        let is_accumulate_only = (14..=26).contains(&id);

        if self.accumulation.is_some() {
            // During accumulation only the general calls usable from both phases (ids 0-5,
            // 100) plus the accumulate-only catalogue (14-26) are reachable; everything else
            // (export/machine/peek/poke/pages/invoke/expunge, ids 7-13) belongs to refine
            // only and reports WHAT in-band, matching the teacher's dispatch gate.
            let allowed = id <= 5 || id == 100 || is_accumulate_only;
            if !allowed {
                if self.gas_left < HOST_BASE_GAS {
                    return DispatchOutcome::Oog;
                }
                self.gas_left -= HOST_BASE_GAS;
                self.registers[7] = REG_WHAT;
                return DispatchOutcome::Continue;
            }
        } else if is_accumulate_only {
            // Accumulate-only handlers assume an accumulation context and will panic (in the
            // Rust sense, not the PVM sense) if dispatched without one; refuse before that can
            // happen rather than relying on every handler to defend against it.
            return DispatchOutcome::Fault;
        }

        let Some(handler) = get_host_function(function_id) else {
            return DispatchOutcome::Fault;
        };

        if self.gas_left < HOST_BASE_GAS {
            return DispatchOutcome::Oog;
        }
        self.gas_left -= HOST_BASE_GAS;

        let mut checkpoint_requested_flag = self
            .accumulation
            .as_ref()
            .map(|a| a.checkpoint_requested)
            .unwrap_or(false);

        let has_lookup_timeslot = self.accumulation.is_some() || self.refine.is_some();

        let (service_id, accounts, nextfreeid, manager_id, registrar_id, delegator_id, yield_hash, provisions, xfers, accumulation_state) =
            match self.accumulation.as_mut() {
                Some(acc) => (
                    Some(acc.service_id),
                    Some(&mut acc.accounts),
                    Some(&mut acc.nextfreeid),
                    Some(acc.state.manager as u64),
                    Some(acc.state.registrar as u64),
                    Some(acc.state.delegator as u64),
                    Some(&mut acc.yield_hash),
                    Some(&mut acc.provisions),
                    Some(&mut acc.xfers),
                    Some(&mut acc.state),
                ),
                None => (None, None, None, None, None, None, None, None, None, None),
            };

        let refine_context: Option<&mut dyn RefineContext> = match self.refine.as_mut() {
            Some(r) => Some(&mut **r),
            None => None,
        };

        let mut context = HostFunctionContext {
            registers: &mut self.registers,
            ram: self.ram,
            gas_remaining: &mut self.gas_left,
            service_id,
            service_account: None,
            accounts,
            manager_id,
            registrar_id,
            nextfreeid,
            lookup_timeslot: if has_lookup_timeslot {
                Some(self.timeslot)
            } else {
                None
            },
            timeslot: Some(self.timeslot),
            expunge_period: Some(self.expunge_period),
            refine_context,
            yield_hash,
            provisions,
            xfers,
            delegator_id,
            num_validators: if self.num_validators > 0 {
                Some(self.num_validators)
            } else {
                None
            },
            accumulation_state,
            checkpoint_requested: Some(&mut checkpoint_requested_flag),
            num_cores: if self.num_cores > 0 {
                Some(self.num_cores)
            } else {
                None
            },
            fetch_entropy_accumulator: self.fetch.entropy_accumulator.as_deref(),
            fetch_authorizer_trace: self.fetch.authorizer_trace.as_deref(),
            fetch_export_segments: self.fetch.export_segments.as_deref(),
            fetch_import_segments: self.fetch.import_segments.as_deref(),
            fetch_work_item_index: self.fetch.work_item_index,
            fetch_accumulate_inputs: self.fetch.accumulate_inputs.as_deref(),
            fetch_work_package_encoded: self.fetch.work_package_encoded.as_deref(),
            fetch_auth_config: self.fetch.auth_config.as_deref(),
            fetch_auth_token: self.fetch.auth_token.as_deref(),
            fetch_refine_context_encoded: self.fetch.refine_context_encoded.as_deref(),
            fetch_work_item_summaries: self.fetch.work_item_summaries.as_deref(),
            fetch_work_item_payloads: self.fetch.work_item_payloads.as_deref(),
            log_messages: Some(&mut self.log_messages),
            fetch_system_constants_config: self.fetch.system_constants_config.as_ref(),
        };

        let result = handler.execute(&mut context);
        drop(context);

        if let Some(acc) = self.accumulation.as_mut() {
            acc.checkpoint_requested = checkpoint_requested_flag;
        }

        match result.result_code {
            x if x == crate::host_functions::base::HOST_RESULT_CONTINUE => DispatchOutcome::Continue,
            x if x == RESULT_CODE_HALT => DispatchOutcome::Halt,
            x if x == RESULT_CODE_PANIC => DispatchOutcome::Panic,
            x if x == RESULT_CODE_FAULT => DispatchOutcome::Fault,
            x if x == RESULT_CODE_OOG => DispatchOutcome::Oog,
            _ => DispatchOutcome::Panic,
        }
    }

    /// Gray Paper: imY' = imX. Snapshots the current accumulate state into `exceptional`
    /// when the just-dispatched call was `checkpoint` (id 17). Call this right after a
    /// `dispatch` that may have set `checkpoint_requested`.
    pub fn maybe_checkpoint(&mut self, exceptional: &mut Implications) {
        if let Some(acc) = &mut self.accumulation {
            if acc.checkpoint_requested {
                *exceptional = acc.to_implications();
                acc.checkpoint_requested = false;
            }
        }
    }

    /// Rolls the accumulate state back to `exceptional`, discarding every mutation since
    /// the last checkpoint (or since invocation start, if none was taken). Call this when
    /// `dispatch` returns `Panic` or `Oog`.
    pub fn rollback(&mut self, exceptional: &Implications) {
        self.accumulation = Some(AccumulationContext::from_implications(exceptional));
    }
}

/// Decodes an encoded implications pair and timeslot/config parameters into a ready
/// [`Driver`]-compatible [`AccumulationContext`] plus its exceptional counterpart.
pub fn accumulation_context_from_pair(pair: &ImplicationsPair) -> (AccumulationContext, Implications) {
    (
        AccumulationContext::from_implications(&pair.regular),
        pair.exceptional.clone(),
    )
}
