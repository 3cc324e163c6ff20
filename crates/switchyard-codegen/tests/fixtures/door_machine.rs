// Generated by switchyard from DoorState.dot.
#[derive(Debug, Clone)]
pub enum DoorState {
    Open(door_state::Open_),
    Closed(door_state::Closed_),
}

#[allow(non_camel_case_types)]
pub mod door_state {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum UnionCases {
        Open,
        Closed,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Open_ {}

    #[derive(Debug, Clone, Default)]
    pub struct Closed_ {}

    impl Open_ {
        // region: Open -> Closed [label="Close"]
        pub fn close(self) -> Closed_ {
            Closed_::default()
        }

        pub fn close_with(self, _trigger: door_trigger::Close_) -> Closed_ {
            self.close()
        }
        // endregion
    }

    impl Closed_ {
        // region: Closed -> Open [label="Open"]
        pub fn open(self) -> Open_ {
            Open_::default()
        }

        pub fn open_with(self, _trigger: door_trigger::Open_) -> Open_ {
            self.open()
        }
        // endregion
    }
}

impl DoorState {
    pub const OPEN: Self = Self::Open(door_state::Open_ {});
    pub const CLOSED: Self = Self::Closed(door_state::Closed_ {});

    pub(crate) fn union_case(&self) -> door_state::UnionCases {
        match self {
            Self::Open(_) => door_state::UnionCases::Open,
            Self::Closed(_) => door_state::UnionCases::Closed,
        }
    }

    pub fn match_with<T>(
        self,
        open: impl FnOnce(door_state::Open_) -> T,
        closed: impl FnOnce(door_state::Closed_) -> T,
    ) -> T {
        match self {
            Self::Open(case) => open(case),
            Self::Closed(case) => closed(case),
        }
    }

    pub async fn match_with_async<T, F0, F1>(
        self,
        open: impl FnOnce(door_state::Open_) -> F0,
        closed: impl FnOnce(door_state::Closed_) -> F1,
    ) -> T
    where
        F0: std::future::Future<Output = T>,
        F1: std::future::Future<Output = T>,
    {
        match self {
            Self::Open(case) => open(case).await,
            Self::Closed(case) => closed(case).await,
        }
    }

    pub async fn match_deferred<T>(
        deferred: impl std::future::Future<Output = Self>,
        open: impl FnOnce(door_state::Open_) -> T,
        closed: impl FnOnce(door_state::Closed_) -> T,
    ) -> T {
        deferred.await.match_with(open, closed)
    }

    pub async fn match_deferred_async<T, F0, F1>(
        deferred: impl std::future::Future<Output = Self>,
        open: impl FnOnce(door_state::Open_) -> F0,
        closed: impl FnOnce(door_state::Closed_) -> F1,
    ) -> T
    where
        F0: std::future::Future<Output = T>,
        F1: std::future::Future<Output = T>,
    {
        deferred.await.match_with_async(open, closed).await
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.union_case())
    }
}

impl PartialEq for DoorState {
    fn eq(&self, other: &Self) -> bool {
        self.union_case() == other.union_case()
    }
}

impl Eq for DoorState {}

impl std::hash::Hash for DoorState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.union_case(), state);
    }
}

#[derive(Debug, Clone)]
pub enum DoorTrigger {
    Close(door_trigger::Close_),
    Open(door_trigger::Open_),
}

#[allow(non_camel_case_types)]
pub mod door_trigger {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum UnionCases {
        Close,
        Open,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Close_ {}

    #[derive(Debug, Clone, Default)]
    pub struct Open_ {}
}

impl DoorTrigger {
    pub const CLOSE: Self = Self::Close(door_trigger::Close_ {});
    pub const OPEN: Self = Self::Open(door_trigger::Open_ {});

    pub(crate) fn union_case(&self) -> door_trigger::UnionCases {
        match self {
            Self::Close(_) => door_trigger::UnionCases::Close,
            Self::Open(_) => door_trigger::UnionCases::Open,
        }
    }

    pub fn match_with<T>(
        self,
        close: impl FnOnce(door_trigger::Close_) -> T,
        open: impl FnOnce(door_trigger::Open_) -> T,
    ) -> T {
        match self {
            Self::Close(case) => close(case),
            Self::Open(case) => open(case),
        }
    }

    pub async fn match_with_async<T, F0, F1>(
        self,
        close: impl FnOnce(door_trigger::Close_) -> F0,
        open: impl FnOnce(door_trigger::Open_) -> F1,
    ) -> T
    where
        F0: std::future::Future<Output = T>,
        F1: std::future::Future<Output = T>,
    {
        match self {
            Self::Close(case) => close(case).await,
            Self::Open(case) => open(case).await,
        }
    }

    pub async fn match_deferred<T>(
        deferred: impl std::future::Future<Output = Self>,
        close: impl FnOnce(door_trigger::Close_) -> T,
        open: impl FnOnce(door_trigger::Open_) -> T,
    ) -> T {
        deferred.await.match_with(close, open)
    }

    pub async fn match_deferred_async<T, F0, F1>(
        deferred: impl std::future::Future<Output = Self>,
        close: impl FnOnce(door_trigger::Close_) -> F0,
        open: impl FnOnce(door_trigger::Open_) -> F1,
    ) -> T
    where
        F0: std::future::Future<Output = T>,
        F1: std::future::Future<Output = T>,
    {
        deferred.await.match_with_async(close, open).await
    }
}

impl std::fmt::Display for DoorTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.union_case())
    }
}

impl PartialEq for DoorTrigger {
    fn eq(&self, other: &Self) -> bool {
        self.union_case() == other.union_case()
    }
}

impl Eq for DoorTrigger {}

impl std::hash::Hash for DoorTrigger {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.union_case(), state);
    }
}

pub trait DoorExtension {
    fn apply(self, trigger: DoorTrigger) -> DoorState;

    fn do_transition(self, trigger: DoorTrigger) -> DoorTransitionResult;
}

impl DoorExtension for DoorState {
    #[allow(unreachable_patterns, clippy::match_single_binding)]
    fn apply(self, trigger: DoorTrigger) -> DoorState {
        match self {
            DoorState::Open(state) => match trigger {
                DoorTrigger::Close(trigger) => DoorState::Closed(state.close_with(trigger)),
                _ => DoorState::Open(state),
            },
            DoorState::Closed(state) => match trigger {
                DoorTrigger::Open(trigger) => DoorState::Open(state.open_with(trigger)),
                _ => DoorState::Closed(state),
            },
        }
    }

    #[allow(unreachable_patterns, clippy::match_single_binding)]
    fn do_transition(self, trigger: DoorTrigger) -> DoorTransitionResult {
        let source = self.clone();
        let fired = trigger.clone();
        match self {
            DoorState::Open(state) => match trigger {
                DoorTrigger::Close(case) => DoorTransitionResult::Transition(DoorTransition::new(source, DoorState::Closed(state.close_with(case)), fired)),
                _ => DoorTransitionResult::InvalidTrigger(DoorInvalidTrigger::new(source, fired)),
            },
            DoorState::Closed(state) => match trigger {
                DoorTrigger::Open(case) => DoorTransitionResult::Transition(DoorTransition::new(source, DoorState::Open(state.open_with(case)), fired)),
                _ => DoorTransitionResult::InvalidTrigger(DoorInvalidTrigger::new(source, fired)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorTransitionResult {
    Transition(DoorTransition),
    InvalidTrigger(DoorInvalidTrigger),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorTransition {
    pub source: DoorState,
    pub destination: DoorState,
    pub trigger: DoorTrigger,
}

impl DoorTransition {
    pub fn new(source: DoorState, destination: DoorState, trigger: DoorTrigger) -> Self {
        Self { source, destination, trigger }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorInvalidTrigger {
    pub source: DoorState,
    pub trigger: DoorTrigger,
}

impl DoorInvalidTrigger {
    pub fn new(source: DoorState, trigger: DoorTrigger) -> Self {
        Self { source, trigger }
    }
}
