//! Accumulation host-call interface of a JAM-protocol PVM: service accounts,
//! storage, preimages, deferred transfers, and the machine registry that the
//! refine-phase host calls address. The opcode interpreter that would trap
//! into these calls from a running guest program is not part of this crate;
//! callers drive [`driver::Driver`] directly from whatever interpreter they
//! already have, suspending at each host-trap opcode.

#![allow(dead_code)]

/// Compile-time removable logging for host calls other than LOG(100). No-op unless built with `--features host_calls_logging`.
#[macro_export]
macro_rules! host_log {
    ($($t:tt)*) => {
        #[cfg(feature = "host_calls_logging")]
        eprintln!($($t)*);
    };
}

/// Log only on error paths (PANIC, HUH, FULL). Prints when `host_calls_errors_only` or `host_calls_logging` is enabled.
#[macro_export]
macro_rules! host_log_error {
    ($($t:tt)*) => {
        #[cfg(any(feature = "host_calls_logging", feature = "host_calls_errors_only"))]
        eprintln!($($t)*);
    };
}

mod codec;
mod config;
mod crypto;
mod driver;
mod host_functions;
mod mock_ram;
mod ram;
mod simple_ram;
mod types;

pub use codec::{
    decode_accumulate_args, decode_implications_pair, decode_natural, encode_fixed_length,
    encode_implications_pair, encode_natural, AccountEntry, AlwaysAccerEntry, CompleteServiceAccount,
    DecodedAccumulateArgs, DecodingResult, DeferredTransfer, Implications, ImplicationsPair,
    PartialState, ProvisionEntry,
};
pub use config::{DEFAULT_GAS_LIMIT, FUNC_LOG, FetchSystemConstantsConfig};
pub use crypto::blake2b256;
pub use driver::{
    accumulation_context_from_pair, AccumulationContext, DispatchOutcome, Driver, FetchSources,
    HOST_BASE_GAS,
};
pub use host_functions::base::{HostFunction, HostFunctionContext, HostFunctionResult};
pub use host_functions::get_host_function;
pub use host_functions::refine::{pages_access_to_memory_type, InvokeResult, RefineContext, RefineMachine};
pub use mock_ram::MockRam;
pub use ram::PvmRam;
pub use simple_ram::SimpleRam;
pub use types::{FaultCheckResult, MemoryAccessType, ReadResult, RegisterState, WriteResult};
pub use types::Ram;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_gas_charges_once_per_call() {
        let mut ram = SimpleRam::new();
        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 100;
        let outcome = driver.dispatch(crate::config::FUNC_GAS as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.gas_left, 100 - HOST_BASE_GAS);
        assert_eq!(driver.registers[7], driver.gas_left);
    }

    #[test]
    fn dispatch_out_of_gas_before_entering_handler() {
        let mut ram = SimpleRam::new();
        let mut driver = Driver::new(&mut ram);
        driver.gas_left = HOST_BASE_GAS - 1;
        let outcome = driver.dispatch(crate::config::FUNC_GAS as u32);
        assert_eq!(outcome, DispatchOutcome::Oog);
    }

    #[test]
    fn unknown_function_id_faults() {
        let mut ram = SimpleRam::new();
        let mut driver = Driver::new(&mut ram);
        let outcome = driver.dispatch(250);
        assert_eq!(outcome, DispatchOutcome::Fault);
    }

    #[test]
    fn accumulate_only_call_rejected_outside_accumulation() {
        let mut ram = SimpleRam::new();
        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 100;
        let outcome = driver.dispatch(crate::config::FUNC_BLESS as u32);
        assert_eq!(outcome, DispatchOutcome::Fault);
    }

    #[test]
    fn refine_only_call_reports_what_during_accumulation() {
        let mut ram = SimpleRam::new();
        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 100;
        driver.accumulation = Some(AccumulationContext::default());
        let outcome = driver.dispatch(crate::config::FUNC_MACHINE as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], crate::config::REG_WHAT);
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use crate::codec::{encode_request_timeslots, set_request_value};
    use crate::config::{
        FUNC_CHECKPOINT, FUNC_FORGET, FUNC_NEW, FUNC_QUERY, FUNC_SOLICIT, FUNC_TRANSFER, REG_FULL,
        REG_LOW, REG_OK,
    };
    use std::collections::HashMap;

    fn account(balance: u64, items: u32, octets: u64, minmemogas: u64) -> CompleteServiceAccount {
        CompleteServiceAccount {
            balance,
            items,
            octets,
            minmemogas,
            ..Default::default()
        }
    }

    fn context_with(self_id: u64, accounts: HashMap<u64, CompleteServiceAccount>) -> AccumulationContext {
        let mut ctx = AccumulationContext {
            service_id: self_id,
            accounts,
            ..Default::default()
        };
        ctx.state.manager = self_id as u32;
        ctx.state.registrar = self_id as u32;
        ctx
    }

    #[test]
    fn new_creates_service_via_registrar_reserved_id() {
        let mut ram = SimpleRam::new();
        ram.init_page(0, 32, MemoryAccessType::Read);
        ram.write_octets_during_initialization(0, &[0xAA; 32]);

        let mut accounts = HashMap::new();
        accounts.insert(10, account(10_000, 2, 81, 0));

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.accumulation = Some(context_with(10, accounts));

        driver.registers = [0, 0, 0, 0, 0, 0, 0, 0, 100, 0, 0, 0, 5];
        let outcome = driver.dispatch(FUNC_NEW as u32);

        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], 5);
        let acc = driver.accumulation.as_ref().unwrap();
        // min_balance(items=2, octets=181, gratis=0) = 100 + 10*2 + 1*181 = 301.
        assert_eq!(acc.accounts[&5].balance, 301);
        assert_eq!(acc.accounts[&10].balance, 9_699);
        assert_eq!(acc.nextfreeid, 0);
    }

    #[test]
    fn transfer_happy_path_appends_deferred_transfer() {
        let mut ram = SimpleRam::new();
        let memo_off = 1024u32;
        ram.init_page(memo_off, 128, MemoryAccessType::Read);
        ram.write_octets_during_initialization(memo_off, &[0u8; 128]);

        let mut accounts = HashMap::new();
        accounts.insert(10, account(10_000, 2, 81, 0));
        accounts.insert(7, account(0, 2, 81, 1_000));

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.accumulation = Some(context_with(10, accounts));

        driver.registers = [0, 0, 0, 0, 0, 0, 0, 7, 500, 5_000, memo_off as u64, 0, 0];
        let outcome = driver.dispatch(FUNC_TRANSFER as u32);

        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], REG_OK);
        let acc = driver.accumulation.as_ref().unwrap();
        assert_eq!(acc.accounts[&10].balance, 9_500);
        assert_eq!(acc.xfers.len(), 1);
        assert_eq!(acc.xfers[0].source, 10);
        assert_eq!(acc.xfers[0].dest, 7);
        assert_eq!(acc.xfers[0].amount, 500);
        assert_eq!(driver.gas_left, 10_000 - HOST_BASE_GAS - 5_000);
    }

    #[test]
    fn transfer_under_gas_reports_low_without_mutation() {
        let mut ram = SimpleRam::new();
        let memo_off = 1024u32;
        ram.init_page(memo_off, 128, MemoryAccessType::Read);
        ram.write_octets_during_initialization(memo_off, &[0u8; 128]);

        let mut accounts = HashMap::new();
        accounts.insert(10, account(10_000, 2, 81, 0));
        accounts.insert(7, account(0, 2, 81, 1_000));

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.accumulation = Some(context_with(10, accounts));

        driver.registers = [0, 0, 0, 0, 0, 0, 0, 7, 500, 100, memo_off as u64, 0, 0];
        let outcome = driver.dispatch(FUNC_TRANSFER as u32);

        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], REG_LOW);
        let acc = driver.accumulation.as_ref().unwrap();
        assert_eq!(acc.accounts[&10].balance, 10_000);
        assert!(acc.xfers.is_empty());
    }

    #[test]
    fn solicit_reports_full_when_balance_too_low() {
        let mut ram = SimpleRam::new();
        let hash_off = 0u32;
        ram.init_page(hash_off, 32, MemoryAccessType::Read);
        ram.write_octets_during_initialization(hash_off, &[0x11; 32]);

        let mut accounts = HashMap::new();
        accounts.insert(10, account(200, 2, 81, 0));

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.accumulation = Some(context_with(10, accounts));

        driver.registers = [0, 0, 0, 0, 0, 0, 0, hash_off as u64, 50, 0, 0, 0, 0];
        let outcome = driver.dispatch(FUNC_SOLICIT as u32);

        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], REG_FULL);
        let acc = driver.accumulation.as_ref().unwrap();
        assert_eq!(acc.accounts[&10].items, 2);
        assert_eq!(acc.accounts[&10].octets, 81);
    }

    #[test]
    fn forget_then_query_reports_request_window() {
        let mut ram = SimpleRam::new();
        let hash_off = 0u32;
        ram.init_page(hash_off, 32, MemoryAccessType::Read);
        let hash = [0x22u8; 32];
        ram.write_octets_during_initialization(hash_off, &hash);

        let mut svc = account(5_000, 4, 212, 0);
        set_request_value(&mut svc, 10, &hash, 50, encode_request_timeslots(&[3]));
        let mut accounts = HashMap::new();
        accounts.insert(10, svc);

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.timeslot = 10;
        driver.accumulation = Some(context_with(10, accounts));

        driver.registers = [0, 0, 0, 0, 0, 0, 0, hash_off as u64, 50, 0, 0, 0, 0];
        let outcome = driver.dispatch(FUNC_FORGET as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], REG_OK);

        driver.registers = [0, 0, 0, 0, 0, 0, 0, hash_off as u64, 50, 0, 0, 0, 0];
        let outcome = driver.dispatch(FUNC_QUERY as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.registers[7], 2 + (1u64 << 32) * 3);
        assert_eq!(driver.registers[8], 10);
    }

    #[test]
    fn checkpoint_then_panic_rolls_back_to_snapshot() {
        let mut ram = SimpleRam::new();
        let memo_off = 1024u32;
        ram.init_page(memo_off, 128, MemoryAccessType::Read);
        ram.write_octets_during_initialization(memo_off, &[0u8; 128]);

        let mut accounts = HashMap::new();
        accounts.insert(10, account(1_000, 2, 81, 0));
        accounts.insert(7, account(0, 2, 81, 0));

        let mut driver = Driver::new(&mut ram);
        driver.gas_left = 10_000;
        driver.accumulation = Some(context_with(10, accounts));

        let outcome = driver.dispatch(FUNC_CHECKPOINT as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);

        let mut exceptional = Implications::default();
        driver.maybe_checkpoint(&mut exceptional);
        assert_eq!(exceptional.state.accounts.len(), 2);

        driver.registers = [0, 0, 0, 0, 0, 0, 0, 7, 400, 100, memo_off as u64, 0, 0];
        let outcome = driver.dispatch(FUNC_TRANSFER as u32);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(driver.accumulation.as_ref().unwrap().accounts[&10].balance, 600);

        // Unreadable offset: the guest panics before completing a second call.
        driver.registers = [0, 0, 0, 0, 0, 0, 0, 9_999_999, 0, 0, 0, 0, 5];
        let outcome = driver.dispatch(FUNC_NEW as u32);
        assert_eq!(outcome, DispatchOutcome::Panic);

        driver.rollback(&exceptional);
        let acc = driver.accumulation.as_ref().unwrap();
        assert_eq!(acc.accounts[&10].balance, 1_000);
        assert!(acc.xfers.is_empty());
    }
}
