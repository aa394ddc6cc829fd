pub(crate) mod cluster;

pub(crate) mod fixtures;

pub(crate) mod ledger;

pub(crate) mod logging;

pub(crate) mod network;
