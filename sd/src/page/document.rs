//! In-memory model of a page's media content
//!
//! Stands in for the document a synchronizer runs against: media elements
//! carry a playback rate and an attachment flag, and structural changes
//! produce mutation records for the growth watch. Hosts drive the model
//! through [`DocumentUpdate`]s delivered over the page's mailbox.

/// Identifier of a media element within one document.
pub type ElementId = u64;

/// Kinds of playable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in a subtree being inserted into the document.
#[derive(Debug, Clone)]
pub enum DomNode {
    /// Non-playable container with children
    Container(Vec<DomNode>),
    /// Text or other inert content
    Inert,
    /// A playable element
    Media(MediaKind),
}

impl DomNode {
    /// A video nested inside wrapper markup, the shape players usually
    /// insert.
    pub fn wrapped_video() -> DomNode {
        DomNode::Container(vec![DomNode::Inert, DomNode::Media(MediaKind::Video)])
    }
}

/// Structural changes a host can make to the document.
#[derive(Debug, Clone)]
pub enum DocumentUpdate {
    /// Insert a subtree at the document root
    Insert(DomNode),
    /// Detach an element by id
    Detach(ElementId),
    /// An attribute changed on an existing node
    Attributes,
    /// Text content changed somewhere
    CharacterData,
}

/// One observed document mutation, as delivered to the growth watch.
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// Nodes were added to or removed from the document
    ChildList { added: Vec<DomNode> },
    /// An attribute changed
    Attributes,
    /// Text content changed
    CharacterData,
}

impl MutationRecord {
    /// True when the added nodes contain a playable element, directly or as
    /// a descendant. One hit is enough to schedule a re-apply, so the scan
    /// stops early.
    pub fn introduces_playable(&self) -> bool {
        match self {
            MutationRecord::ChildList { added } => contains_playable(added),
            MutationRecord::Attributes | MutationRecord::CharacterData => false,
        }
    }
}

fn contains_playable(nodes: &[DomNode]) -> bool {
    nodes.iter().any(|node| match node {
        DomNode::Media(_) => true,
        DomNode::Container(children) => contains_playable(children),
        DomNode::Inert => false,
    })
}

/// One playable element tracked by the document.
#[derive(Debug, Clone)]
pub struct MediaElement {
    pub id: ElementId,
    pub kind: MediaKind,
    /// Rate last applied to this element. New elements start at 1.0
    /// regardless of the page's desired speed.
    pub playback_rate: f64,
    /// False once the element left the document. It stays known because a
    /// holder may still reference it, but rate changes skip it.
    pub attached: bool,
}

/// The media-relevant state of one page document.
#[derive(Debug, Default)]
pub struct PageDocument {
    elements: Vec<MediaElement>,
    next_id: ElementId,
}

impl PageDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document pre-populated with media, for pages whose players exist
    /// before the synchronizer starts.
    pub fn with_media(kinds: &[MediaKind]) -> Self {
        let mut document = Self::new();
        for kind in kinds {
            document.attach(*kind);
        }
        document
    }

    fn attach(&mut self, kind: MediaKind) -> ElementId {
        self.next_id += 1;
        let id = self.next_id;
        self.elements.push(MediaElement {
            id,
            kind,
            playback_rate: 1.0,
            attached: true,
        });
        id
    }

    /// Apply a host update and return the mutation record an observer of
    /// that change would see.
    pub fn apply_update(&mut self, update: DocumentUpdate) -> MutationRecord {
        match update {
            DocumentUpdate::Insert(subtree) => {
                self.attach_playables(&subtree);
                MutationRecord::ChildList { added: vec![subtree] }
            }
            DocumentUpdate::Detach(id) => {
                self.detach(id);
                MutationRecord::ChildList { added: Vec::new() }
            }
            DocumentUpdate::Attributes => MutationRecord::Attributes,
            DocumentUpdate::CharacterData => MutationRecord::CharacterData,
        }
    }

    fn attach_playables(&mut self, node: &DomNode) {
        match node {
            DomNode::Media(kind) => {
                self.attach(*kind);
            }
            DomNode::Container(children) => {
                for child in children {
                    self.attach_playables(child);
                }
            }
            DomNode::Inert => {}
        }
    }

    fn detach(&mut self, id: ElementId) -> bool {
        match self.elements.iter_mut().find(|element| element.id == id) {
            Some(element) => {
                element.attached = false;
                true
            }
            None => false,
        }
    }

    /// Apply a rate to every attached element, best-effort. Detached
    /// elements are skipped, never an error. Returns how many elements
    /// accepted the rate.
    pub fn apply_rate(&mut self, rate: f64) -> usize {
        let mut applied = 0;
        for element in &mut self.elements {
            if element.attached {
                element.playback_rate = rate;
                applied += 1;
            }
        }
        applied
    }

    pub fn elements(&self) -> &[MediaElement] {
        &self.elements
    }

    pub fn attached_count(&self) -> usize {
        self.elements.iter().filter(|element| element.attached).count()
    }
}
