pub enum HookResult {
    Continue,
    Break,
}

// This changes the contorlflow, returning on hook break
macro_rules! process_hook_result {
    ($hook_res:expr) => {
        match $hook_res? {
            $crate::HookResult::Continue => {}
            $crate::HookResult::Break => return Ok(()),
        }
    };
}

pub(crate) use process_hook_result;

pub mod a2c;
pub mod ppo;
