// implementation of the serializer.
//
// the basic architecture is as such:
//
// serializer handles wrap around Arc<shared state>
//                                       |
//          /----------------------------/
//          v
//       shared state
//          |
//          |------ it contains a mutex around the pending queue and the running flag:
//          |
//          |       the pending queue is a VecDeque holding one oneshot sender per call
//          |       whose turn has not yet been served, in arrival order. the caller's
//          |       returned future is the matching receiver. the running flag is true
//          |       exactly while an upstream invocation is outstanding.
//          |
//          \------ it contains a second mutex around the upstream factory, locked only
//                  for the moment it takes to start one invocation.
//
// turns are served by a driver task: the enqueue that finds the serializer idle flips
// the running flag, starts the first invocation, and spawns the driver, which then
// loops--settle the front turn, start the next invocation--until the queue drains and
// it exits. the flag flip and the queue operations around each settlement each happen
// under a single lock acquisition, which is what makes overlapping invocations
// impossible no matter how callers race.
//
// the organization of these modules is as such:
//
//      core: the queue/flag state machine and the driver task. fully safe, but panicky
//       ^    on violated internal invariants and inconvenient to use directly.
//       |
//      api: a wrapper around core that adapts it into an API that is convenient and
//           defensive. the crate re-exports this API publically.
//
// there is also the error module, which contains the relevant error types, which is
// also re-exported publically.

pub(crate) mod api;
pub(crate) mod error;

mod core;
