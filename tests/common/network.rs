use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
    time::Duration,
};

use ed25519_dalek::VerifyingKey;
use sumeragi::networking::{
    messages::Message,
    network::{Delivery, Network},
};

/// A mock network stub which passes messages from and to threads using channels.
///
/// Peers listed in the shared `unreachable` set neither receive messages nor have theirs delivered.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    my_verifying_key: VerifyingKey,
    all_peers: HashMap<VerifyingKey, Sender<(VerifyingKey, Message)>>,
    inbox: Arc<Mutex<Receiver<(VerifyingKey, Message)>>>,
    unreachable: Arc<Mutex<HashSet<VerifyingKey>>>,
}

impl Network for NetworkStub {
    fn send(&mut self, peer: VerifyingKey, message: Message, _timeout: Duration) -> Delivery {
        let unreachable = self.unreachable.lock().unwrap();
        if unreachable.contains(&peer) || unreachable.contains(&self.my_verifying_key) {
            return Delivery::Timeout;
        }
        match self.all_peers.get(&peer) {
            Some(peer) if peer.send((self.my_verifying_key, message)).is_ok() => Delivery::Ack,
            _ => Delivery::Timeout,
        }
    }

    fn recv(&mut self) -> Option<(VerifyingKey, Message)> {
        match self.inbox.lock().unwrap().try_recv() {
            Ok(o_m) => Some(o_m),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => panic!(),
        }
    }
}

/// Create one connected [`NetworkStub`] per peer, plus the shared set of peers to treat as unreachable.
pub(crate) fn mock_network(
    peers: impl Iterator<Item = VerifyingKey>,
) -> (Vec<NetworkStub>, Arc<Mutex<HashSet<VerifyingKey>>>) {
    let mut all_peers = HashMap::new();
    let unreachable = Arc::new(Mutex::new(HashSet::new()));
    let peer_and_inboxes: Vec<(VerifyingKey, Receiver<(VerifyingKey, Message)>)> = peers
        .map(|peer| {
            let (sender, receiver) = mpsc::channel();
            all_peers.insert(peer, sender);

            (peer, receiver)
        })
        .collect();

    let stubs = peer_and_inboxes
        .into_iter()
        .map(|(my_verifying_key, inbox)| NetworkStub {
            my_verifying_key,
            all_peers: all_peers.clone(),
            inbox: Arc::new(Mutex::new(inbox)),
            unreachable: Arc::clone(&unreachable),
        })
        .collect();

    (stubs, unreachable)
}

/// A message captured by a [`RecordingNetwork`].
#[derive(Clone, Debug)]
pub(crate) struct Envelope {
    pub(crate) from: VerifyingKey,
    pub(crate) to: VerifyingKey,
    pub(crate) message: Message,
}

pub(crate) type Outbox = Arc<Mutex<VecDeque<Envelope>>>;

/// A network that never delivers anything by itself. Every send is appended to a shared outbox, from
/// which a test decides what to deliver, to whom, and in which order.
#[derive(Clone)]
pub(crate) struct RecordingNetwork {
    me: VerifyingKey,
    outbox: Outbox,
}

impl RecordingNetwork {
    pub(crate) fn new(me: VerifyingKey, outbox: Outbox) -> RecordingNetwork {
        RecordingNetwork { me, outbox }
    }
}

impl Network for RecordingNetwork {
    fn send(&mut self, peer: VerifyingKey, message: Message, _timeout: Duration) -> Delivery {
        self.outbox.lock().unwrap().push_back(Envelope {
            from: self.me,
            to: peer,
            message,
        });
        Delivery::Ack
    }

    fn recv(&mut self) -> Option<(VerifyingKey, Message)> {
        None
    }
}
